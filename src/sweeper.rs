//! Background retention sweep started after a delete.
//!
//! The sweep runs on its own thread with its own engine instance. Its
//! outcome travels back over a channel so failures are observable without
//! ever affecting the delete that started it.

use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::config::Config;
use crate::engine::LifecycleEngine;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::models::SweepReport;

pub struct BackgroundSweep;

impl BackgroundSweep {
    pub fn spawn(config: Config, fs: Arc<dyn FileSystem>) -> SweepHandle {
        let (tx, rx) = mpsc::channel();
        let join = thread::Builder::new()
            .name("retention-sweep".to_string())
            .spawn(move || {
                let engine = LifecycleEngine::new(config, fs);
                let outcome = engine.sweep(false);
                if let Err(err) = &outcome {
                    tracing::error!(error = %err, "background retention sweep failed");
                }
                // The receiver may already be gone; nobody is waiting then.
                let _ = tx.send(outcome);
            });

        match join {
            Ok(join) => SweepHandle { rx, join: Some(join) },
            Err(err) => {
                tracing::error!(error = %err, "could not start retention sweep thread");
                SweepHandle { rx, join: None }
            }
        }
    }
}

/// Supervises one background sweep.
pub struct SweepHandle {
    rx: Receiver<Result<SweepReport>>,
    join: Option<JoinHandle<()>>,
}

impl SweepHandle {
    /// Blocks until the sweep finishes. `None` if it never reported.
    pub fn wait(mut self) -> Option<Result<SweepReport>> {
        let outcome = self.rx.recv().ok();
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                tracing::error!("retention sweep thread panicked");
            }
        }
        outcome
    }
}
