//! Navigation primitive used when a session is forcibly ended

use crate::routes;
use std::sync::{Mutex, PoisonError};
use tracing::info;

/// Where the user currently is and how to move them
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;
    fn redirect(&self, location: &str);
    /// Blocking, user-facing notification
    fn notify(&self, message: &str);
}

/// Navigator for the command line: tracks the location a command represents
/// and remembers where a forced logout sent the user
#[derive(Debug)]
pub struct CliNavigator {
    location: Mutex<String>,
    redirected_to: Mutex<Option<String>>,
}

impl CliNavigator {
    pub fn new() -> Self {
        Self {
            location: Mutex::new(routes::ROOT.to_string()),
            redirected_to: Mutex::new(None),
        }
    }

    /// Record the location the running command represents
    pub fn visit(&self, location: impl Into<String>) {
        *self.location.lock().unwrap_or_else(PoisonError::into_inner) = location.into();
    }

    /// Location of the last forced redirect, if one happened
    pub fn redirected_to(&self) -> Option<String> {
        self.redirected_to
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for CliNavigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator for CliNavigator {
    fn current_path(&self) -> String {
        self.location
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn redirect(&self, location: &str) {
        info!("Redirecting to {}", location);
        self.visit(location);
        *self.redirected_to.lock().unwrap_or_else(PoisonError::into_inner) = Some(location.to_string());
    }

    fn notify(&self, message: &str) {
        eprintln!("{}", message);
    }
}

/// Navigator that records every call, for assertions
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingNavigator {
    pub location: Mutex<String>,
    pub redirects: Mutex<Vec<String>>,
    pub notifications: Mutex<Vec<String>>,
}

#[cfg(test)]
impl RecordingNavigator {
    pub fn at(location: &str) -> Self {
        Self {
            location: Mutex::new(location.to_string()),
            ..Self::default()
        }
    }

    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().unwrap().clone()
    }

    pub fn notifications(&self) -> Vec<String> {
        self.notifications.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Navigator for RecordingNavigator {
    fn current_path(&self) -> String {
        self.location.lock().unwrap().clone()
    }

    fn redirect(&self, location: &str) {
        *self.location.lock().unwrap() = location.to_string();
        self.redirects.lock().unwrap().push(location.to_string());
    }

    fn notify(&self, message: &str) {
        self.notifications.lock().unwrap().push(message.to_string());
    }
}
