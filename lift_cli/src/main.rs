use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use lift_core::events::{self, EventStream};
use lift_core::screens::{
    CategoryChoice, ExerciseAdditionController, ExerciseAdditionIntent, ExercisesController,
    ExercisesIntent, ExercisesMode, LoggedSetRow, Screen, ScreenArgs, TrackingController,
    TrackingDialog, TrackingIntent, TrackingView, WeightWorkoutController, WeightWorkoutIntent,
    WorkoutDialog,
};
use lift_core::*;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "lift")]
#[command(about = "Workout log for weight training", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Populate an empty library with the default exercises
    Init,

    /// Manage the exercise library
    Exercise {
        #[command(subcommand)]
        command: ExerciseCommand,
    },

    /// Show and edit the workout of a day
    Workout {
        #[command(subcommand)]
        command: WorkoutCommand,
    },

    /// Log and edit sets of one exercise
    Set {
        #[command(subcommand)]
        command: SetCommand,
    },

    /// Run the rest timer for an exercise
    Timer {
        exercise: String,

        /// Countdown length, defaults to the configured duration
        #[arg(long)]
        secs: Option<u32>,

        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Append the sets of a day to a CSV file
    Export {
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Output file, defaults to <data-dir>/sets.csv
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show or write the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum ExerciseCommand {
    /// Add an exercise to the library
    Add {
        name: String,

        #[arg(long, default_value = "")]
        category: String,

        #[arg(long, default_value = "")]
        notes: String,
    },

    /// List exercises
    List {
        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        search: Option<String>,
    },

    /// List categories in use
    Categories,
}

#[derive(Subcommand)]
enum WorkoutCommand {
    /// Show the workout and its exercises
    Show {
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Add exercises to the workout, creating it if needed
    Add {
        #[arg(required = true)]
        exercises: Vec<String>,

        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Remove exercises from the workout
    Remove {
        #[arg(required = true)]
        exercises: Vec<String>,

        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Record the workout start time
    Start {
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Set an explicit time (HH:MM, UTC) instead of now
        #[arg(long)]
        at: Option<String>,

        /// Clear the start time
        #[arg(long, conflicts_with = "at")]
        reset: bool,
    },

    /// Record the workout end time
    End {
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Set an explicit time (HH:MM, UTC) instead of now
        #[arg(long)]
        at: Option<String>,

        /// Clear the end time
        #[arg(long, conflicts_with = "at")]
        reset: bool,
    },
}

#[derive(Subcommand)]
enum SetCommand {
    /// Add sets with the same weight and reps
    Add {
        exercise: String,

        #[arg(long)]
        weight: String,

        #[arg(long)]
        reps: String,

        #[arg(long, default_value = "1")]
        sets: String,

        /// Unit of --weight, defaults to the configured unit
        #[arg(long)]
        unit: Option<WeightUnit>,

        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// List logged sets
    List {
        exercise: String,

        #[arg(long)]
        unit: Option<WeightUnit>,

        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Mark a set completed now
    Complete {
        exercise: String,
        number: u32,

        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Roll a completed set back
    Uncomplete {
        exercise: String,
        number: u32,

        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Delete sets and renumber the rest
    Delete {
        exercise: String,

        #[arg(required = true)]
        numbers: Vec<u32>,

        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Swap two sets
    Move {
        exercise: String,
        from: u32,
        to: u32,

        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Replace the notes of a set
    Note {
        exercise: String,
        number: u32,
        text: String,

        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Set the RPE of a set (ignored while locked)
    Rpe {
        exercise: String,
        number: u32,
        value: f32,

        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Lock or unlock the RPE of a set
    LockRpe {
        exercise: String,
        number: u32,

        #[arg(long)]
        unlock: bool,

        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    // Writing the config file must not require reading one first
    if let Commands::Config {
        command: ConfigCommand::Init { force },
    } = cli.command
    {
        return init_config(cli.config, force);
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    lift_core::logging::init_with_level(&config.logging.level);

    let store_path = match &cli.data_dir {
        Some(dir) => dir.join("workouts.json"),
        None => config.store_path(),
    };
    tracing::debug!("Using store at {:?}", store_path);
    let app = App {
        store: Arc::new(FileStore::open(&store_path)?),
        clock: Arc::new(SystemClock),
        data_dir: store_path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| config.data.data_dir.clone()),
        config,
    };

    match cli.command {
        Commands::Init => app.init(),
        Commands::Exercise { command } => app.exercise(command),
        Commands::Workout { command } => app.workout(command),
        Commands::Set { command } => app.set(command),
        Commands::Timer {
            exercise,
            secs,
            date,
        } => app.timer(&exercise, date, secs),
        Commands::Config { .. } => {
            print!("{}", app.config.to_toml()?);
            Ok(())
        }
        Commands::Export { date, output } => {
            let date = app.date(date);
            let output = output.unwrap_or_else(|| app.data_dir.join("sets.csv"));
            let count = lift_core::export::export_date(app.store.as_ref(), date, &output)?;
            println!("Exported {} sets to {}", count, output.display());
            Ok(())
        }
    }
}

fn init_config(path: Option<PathBuf>, force: bool) -> Result<()> {
    let config = Config::default();
    let path = match path {
        Some(path) => path,
        None => Config::default_config_path(),
    };
    if path.exists() && !force {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }
    if path == Config::default_config_path() {
        config.save()?;
    } else {
        config.save_to(&path)?;
    }
    println!("Wrote {}", path.display());
    Ok(())
}

struct App {
    store: Arc<FileStore>,
    clock: Arc<SystemClock>,
    data_dir: PathBuf,
    config: Config,
}

impl App {
    fn date(&self, date: Option<NaiveDate>) -> NaiveDate {
        date.unwrap_or_else(|| self.clock.today())
    }

    fn find_exercise(&self, name: &str) -> Result<Exercise> {
        let wanted = name.trim().to_lowercase();
        self.store
            .watch_exercises()?
            .borrow()
            .iter()
            .find(|e| e.name.to_lowercase() == wanted)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("exercise {:?}", name)))
    }

    fn init(&self) -> Result<()> {
        let seeded = lift_core::library::seed_library(self.store.as_ref())?;
        if seeded == 0 {
            println!("Library already has exercises");
        } else {
            println!("Added {} default exercises", seeded);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Exercises
    // ------------------------------------------------------------------

    fn exercise(&self, command: ExerciseCommand) -> Result<()> {
        match command {
            ExerciseCommand::Add {
                name,
                category,
                notes,
            } => {
                let (tx, mut rx) = events::channel();
                let mut screen = ExerciseAdditionController::new(
                    self.store.clone(),
                    tx,
                    self.config.library.categories.clone(),
                )?;
                screen.dispatch(ExerciseAdditionIntent::NameChanged(name))?;
                screen.dispatch(ExerciseAdditionIntent::NotesChanged(notes))?;
                if !category.trim().is_empty() {
                    screen.dispatch(ExerciseAdditionIntent::ChooseCategory(
                        CategoryChoice::Existing(category.trim().to_string()),
                    ))?;
                }
                if !screen.snapshot().can_add {
                    return Err(Error::InvalidArgument {
                        key: "name",
                        value: String::new(),
                    });
                }
                screen.dispatch(ExerciseAdditionIntent::Add)?;
                print_events(&mut rx);
            }
            ExerciseCommand::List { category, search } => {
                let (tx, _rx) = events::channel();
                let mut screen = ExercisesController::new(
                    self.store.clone(),
                    tx,
                    ExercisesMode::Management,
                    self.clock.today(),
                )?;
                screen.dispatch(ExercisesIntent::SelectCategory(category))?;
                if let Some(query) = search {
                    screen.dispatch(ExercisesIntent::SearchChanged(query))?;
                }
                for exercise in screen.snapshot().exercises {
                    if exercise.category.is_empty() {
                        println!("{}", exercise.name);
                    } else {
                        println!("{}\t{}", exercise.name, exercise.category);
                    }
                }
            }
            ExerciseCommand::Categories => {
                for category in self.store.watch_categories()?.borrow().iter() {
                    println!("{}", category);
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Workouts
    // ------------------------------------------------------------------

    fn workout(&self, command: WorkoutCommand) -> Result<()> {
        match command {
            WorkoutCommand::Show { date } => {
                let screen = self.workout_screen(date)?;
                print_workout(&screen);
            }
            WorkoutCommand::Add { exercises, date } => {
                let (tx, mut rx) = events::channel();
                let mut screen = ExercisesController::new(
                    self.store.clone(),
                    tx,
                    ExercisesMode::Selection,
                    self.date(date),
                )?;
                for name in &exercises {
                    let exercise = self.find_exercise(name)?;
                    if !screen.snapshot().selected_ids.contains(&exercise.id) {
                        screen.dispatch(ExercisesIntent::ToggleSelection(exercise.id))?;
                    }
                }
                screen.dispatch(ExercisesIntent::AddSelectedToWorkout)?;
                print_events(&mut rx);
            }
            WorkoutCommand::Remove { exercises, date } => {
                let mut screen = self.workout_screen(date)?;
                for name in &exercises {
                    let exercise = self.find_exercise(name)?;
                    let view = screen.snapshot();
                    if !view.exercises.iter().any(|e| e.id == exercise.id) {
                        return Err(Error::NotFound(format!(
                            "{} in the workout on {}",
                            exercise.name, view.selected_date
                        )));
                    }
                    if !view.selected_ids.contains(&exercise.id) {
                        screen.dispatch(WeightWorkoutIntent::ToggleExerciseSelection(exercise.id))?;
                    }
                }
                screen.dispatch(WeightWorkoutIntent::DeleteSelected)?;
                println!("Removed {} exercises", exercises.len());
            }
            WorkoutCommand::Start { date, at, reset } => {
                let mut screen = self.workout_screen(date)?;
                let plan = TimeEdit {
                    set_now: WeightWorkoutIntent::StartWorkout,
                    edit: WorkoutDialog::EditStartTime,
                    reset: (WorkoutDialog::ResetStartTime, WeightWorkoutIntent::ConfirmResetStart),
                };
                edit_workout_time(&mut screen, plan, at, reset)?;
                print_workout(&screen);
            }
            WorkoutCommand::End { date, at, reset } => {
                let mut screen = self.workout_screen(date)?;
                let plan = TimeEdit {
                    set_now: WeightWorkoutIntent::EndWorkout,
                    edit: WorkoutDialog::EditEndTime,
                    reset: (WorkoutDialog::ResetEndTime, WeightWorkoutIntent::ConfirmResetEnd),
                };
                edit_workout_time(&mut screen, plan, at, reset)?;
                print_workout(&screen);
            }
        }
        Ok(())
    }

    fn workout_screen(&self, date: Option<NaiveDate>) -> Result<WeightWorkoutController> {
        WeightWorkoutController::new(self.store.clone(), self.clock.clone(), self.date(date))
    }

    // ------------------------------------------------------------------
    // Sets
    // ------------------------------------------------------------------

    fn tracking(&self, exercise: &str, date: Option<NaiveDate>) -> Result<TrackingController> {
        let exercise = self.find_exercise(exercise)?;
        let args = ScreenArgs::new()
            .with("exerciseId", exercise.id)
            .with("exerciseName", &exercise.name)
            .with("date", self.date(date));
        TrackingController::open(
            self.store.clone(),
            self.clock.clone(),
            self.config.tracking_settings(),
            &args,
        )
    }

    fn set(&self, command: SetCommand) -> Result<()> {
        match command {
            SetCommand::Add {
                exercise,
                weight,
                reps,
                sets,
                unit,
                date,
            } => {
                let mut screen = self.tracking(&exercise, date)?;
                use_unit(&mut screen, unit)?;
                screen.dispatch(TrackingIntent::WeightChanged(weight.clone()))?;
                screen.dispatch(TrackingIntent::RepsChanged(reps.clone()))?;
                screen.dispatch(TrackingIntent::SetsChanged(sets))?;
                if !screen.snapshot().can_add_sets {
                    tracing::debug!("Rejected set input {:?} x {:?}", weight, reps);
                    return Err(Error::InvalidArgument {
                        key: "weight/reps",
                        value: format!("{} x {}", weight, reps),
                    });
                }
                screen.dispatch(TrackingIntent::AddSets)?;
                print_sets(&screen.snapshot());
            }
            SetCommand::List {
                exercise,
                unit,
                date,
            } => {
                let mut screen = self.tracking(&exercise, date)?;
                use_unit(&mut screen, unit)?;
                print_sets(&screen.snapshot());
            }
            SetCommand::Complete {
                exercise,
                number,
                date,
            } => {
                let mut screen = self.tracking(&exercise, date)?;
                let id = set_id(&screen, number)?;
                screen.dispatch(TrackingIntent::CompleteSet(id))?;
                print_sets(&screen.snapshot());
            }
            SetCommand::Uncomplete {
                exercise,
                number,
                date,
            } => {
                let mut screen = self.tracking(&exercise, date)?;
                let id = set_id(&screen, number)?;
                screen.dispatch(TrackingIntent::ShowDialog(TrackingDialog::UncheckSet(id)))?;
                screen.dispatch(TrackingIntent::ConfirmDialog)?;
                print_sets(&screen.snapshot());
            }
            SetCommand::Delete {
                exercise,
                numbers,
                date,
            } => {
                let mut screen = self.tracking(&exercise, date)?;
                let ids = numbers
                    .iter()
                    .map(|n| set_id(&screen, *n))
                    .collect::<Result<std::collections::BTreeSet<_>>>()?;
                for id in ids {
                    screen.dispatch(TrackingIntent::ToggleSetSelection(id))?;
                }
                screen.dispatch(TrackingIntent::DeleteSelected)?;
                print_sets(&screen.snapshot());
            }
            SetCommand::Move {
                exercise,
                from,
                to,
                date,
            } => {
                let mut screen = self.tracking(&exercise, date)?;
                set_id(&screen, from)?;
                set_id(&screen, to)?;
                screen.dispatch(TrackingIntent::MoveSet {
                    from: from as usize - 1,
                    to: to as usize - 1,
                })?;
                print_sets(&screen.snapshot());
            }
            SetCommand::Note {
                exercise,
                number,
                text,
                date,
            } => {
                let mut screen = self.tracking(&exercise, date)?;
                let id = set_id(&screen, number)?;
                screen.dispatch(TrackingIntent::BeginEditNote(id))?;
                screen.dispatch(TrackingIntent::NoteTextChanged(text))?;
                screen.dispatch(TrackingIntent::SaveNote)?;
                print_sets(&screen.snapshot());
            }
            SetCommand::Rpe {
                exercise,
                number,
                value,
                date,
            } => {
                let mut screen = self.tracking(&exercise, date)?;
                let id = set_id(&screen, number)?;
                screen.dispatch(TrackingIntent::ChangeRpe(id, value))?;
                print_sets(&screen.snapshot());
            }
            SetCommand::LockRpe {
                exercise,
                number,
                unlock,
                date,
            } => {
                let mut screen = self.tracking(&exercise, date)?;
                let id = set_id(&screen, number)?;
                if unlock {
                    screen.dispatch(TrackingIntent::ShowDialog(TrackingDialog::UnlockRpe(id)))?;
                    screen.dispatch(TrackingIntent::ConfirmDialog)?;
                } else {
                    screen.dispatch(TrackingIntent::LockRpe(id))?;
                }
                print_sets(&screen.snapshot());
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Timer
    // ------------------------------------------------------------------

    fn timer(&self, exercise: &str, date: Option<NaiveDate>, secs: Option<u32>) -> Result<()> {
        let screen = self.tracking(exercise, date)?;
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;

        rt.block_on(async {
            let (tx, mut rx) = events::channel();
            let handle = lift_core::runtime::spawn(screen, self.store.revisions(), Some(tx));
            if let Some(secs) = secs {
                handle.send(TrackingIntent::TimerDurationChanged(secs));
            }
            handle.send(TrackingIntent::TimerStart);

            let mut view = handle.view();
            let mut last_shown = None;
            while view.changed().await.is_ok() {
                let timer = view.borrow_and_update().timer.clone();
                if timer.alert {
                    println!("Rest over");
                    break;
                }
                if timer.running && last_shown != Some(timer.remaining_secs) {
                    println!("{}s", timer.remaining_secs);
                    last_shown = Some(timer.remaining_secs);
                }
            }
            handle.close().await;
            print_events(&mut rx);
        });
        Ok(())
    }
}

struct TimeEdit {
    set_now: WeightWorkoutIntent,
    edit: WorkoutDialog,
    reset: (WorkoutDialog, WeightWorkoutIntent),
}

fn edit_workout_time(
    screen: &mut WeightWorkoutController,
    plan: TimeEdit,
    at: Option<String>,
    reset: bool,
) -> Result<()> {
    let view = screen.snapshot();
    if view.workout.is_none() {
        return Err(Error::NotFound(format!("workout on {}", view.selected_date)));
    }

    if reset {
        let (dialog, confirm) = plan.reset;
        screen.dispatch(WeightWorkoutIntent::ShowDialog(dialog))?;
        screen.dispatch(confirm)?;
        return Ok(());
    }

    let Some(at) = at else {
        screen.dispatch(plan.set_now)?;
        return Ok(());
    };
    let (hours, minutes) = at.split_once(':').ok_or_else(|| Error::InvalidArgument {
        key: "at",
        value: at.clone(),
    })?;
    screen.dispatch(WeightWorkoutIntent::ShowDialog(plan.edit))?;
    screen.dispatch(WeightWorkoutIntent::HoursChanged(hours.to_string()))?;
    screen.dispatch(WeightWorkoutIntent::MinutesChanged(minutes.to_string()))?;
    let view = screen.snapshot();
    if view.time_input_hours != hours || view.time_input_minutes != minutes {
        screen.dispatch(WeightWorkoutIntent::DismissDialog)?;
        return Err(Error::InvalidArgument { key: "at", value: at });
    }
    screen.dispatch(WeightWorkoutIntent::SaveEditedTime)?;
    Ok(())
}

fn use_unit(screen: &mut TrackingController, unit: Option<WeightUnit>) -> Result<()> {
    if let Some(unit) = unit {
        if screen.snapshot().unit != unit {
            screen.dispatch(TrackingIntent::ToggleUnit)?;
        }
    }
    Ok(())
}

fn set_id(screen: &TrackingController, number: u32) -> Result<SetId> {
    let view = screen.snapshot();
    view.logged_sets
        .iter()
        .find(|row| row.entry.set_number == number)
        .map(|row| row.entry.id)
        .ok_or_else(|| Error::NotFound(format!("set #{} of {}", number, view.exercise_name)))
}

fn print_events(rx: &mut EventStream) {
    while let Ok(event) = rx.try_recv() {
        println!("{}", event);
    }
}

fn clock_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "-".into())
}

fn print_workout(screen: &WeightWorkoutController) {
    let view = screen.snapshot();
    let Some(workout) = &view.workout else {
        println!("No workout on {}", view.selected_date);
        return;
    };
    println!("Workout {}", workout.date);
    println!("  Start: {}", clock_time(workout.start_time));
    println!("  End:   {}", clock_time(workout.end_time));
    if view.exercises.is_empty() {
        println!("  No exercises");
    }
    for exercise in &view.exercises {
        println!("  - {} ({})", exercise.name, exercise.category);
    }
}

fn format_row(row: &LoggedSetRow, unit: WeightUnit) -> String {
    let set = &row.entry;
    let mut line = format!(
        "#{} {:.1} {} x {}",
        set.set_number, row.display_weight, unit, set.reps
    );
    if set.completed {
        line.push_str(" done");
    }
    if let Some(rest) = set.rest_time_secs {
        line.push_str(&format!(" rest {}s", rest));
    }
    if let Some(time) = set.exercise_time_secs {
        line.push_str(&format!(" time {}s", time));
    }
    if let Some(rpe) = set.rpe {
        line.push_str(&format!(" rpe {:.1}", rpe));
        if set.rpe_locked {
            line.push_str(" (locked)");
        }
    }
    if !set.notes.is_empty() {
        line.push_str(&format!(" \"{}\"", set.notes));
    }
    line
}

fn print_sets(view: &TrackingView) {
    println!("{} on {}", view.exercise_name, view.date);
    if view.logged_sets.is_empty() {
        println!("  No sets");
    }
    for row in &view.logged_sets {
        println!("  {}", format_row(row, view.unit));
    }
}
