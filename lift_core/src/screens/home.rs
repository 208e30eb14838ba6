//! Home screen: tab bar and calendar.

use super::{Effect, Screen};
use crate::combine::Combiner;
use crate::Result;
use chrono::NaiveDate;
use tokio::sync::watch;

#[derive(Clone, Debug, PartialEq)]
pub struct HomeView {
    pub selected_tab: usize,
    pub calendar_expanded: bool,
    pub selected_date: NaiveDate,
}

#[derive(Clone, Debug)]
pub enum HomeIntent {
    SelectTab(usize),
    ToggleCalendar,
    SelectDate(NaiveDate),
}

pub struct HomeController {
    state: Combiner<HomeView, HomeView>,
}

fn merge(inputs: &HomeView) -> HomeView {
    inputs.clone()
}

impl HomeController {
    pub fn new(today: NaiveDate) -> Self {
        let inputs = HomeView {
            selected_tab: 0,
            calendar_expanded: false,
            selected_date: today,
        };
        Self {
            state: Combiner::new(inputs, merge),
        }
    }

    pub fn snapshot(&self) -> HomeView {
        self.state.snapshot()
    }
}

impl Screen for HomeController {
    type Intent = HomeIntent;
    type View = HomeView;

    fn dispatch(&mut self, intent: HomeIntent) -> Result<Vec<Effect>> {
        match intent {
            HomeIntent::SelectTab(index) => self.state.update(|s| s.selected_tab = index),
            HomeIntent::ToggleCalendar => {
                self.state.update(|s| s.calendar_expanded = !s.calendar_expanded)
            }
            HomeIntent::SelectDate(date) => self.state.update(|s| {
                s.selected_date = date;
                s.calendar_expanded = false;
            }),
        }
        Ok(Vec::new())
    }

    fn subscribe(&self) -> watch::Receiver<HomeView> {
        self.state.subscribe()
    }
}
