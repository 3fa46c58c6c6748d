/// Events emitted while a transfer runs. A task corresponds to one planned
/// transfer step; phases group planning and execution.
#[derive(Debug, Clone)]
pub enum Progress {
    PhaseStart { name: &'static str },
    PhaseFinish,

    TaskStart { total_steps: u64 },
    TaskIncrement,
    TaskFinish,

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }

    /// Runs `body` between a `PhaseStart`/`PhaseFinish` pair. `PhaseFinish`
    /// is only sent when `body` succeeds.
    pub fn phase<T, E>(
        &self,
        name: &'static str,
        body: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        self.report(Progress::PhaseStart { name });
        let result = body()?;
        self.report(Progress::PhaseFinish);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording_reporter<'a>(log: Arc<Mutex<Vec<String>>>) -> ProgressReporter<'a> {
        ProgressReporter::with_callback(Box::new(move |event| {
            log.lock().unwrap().push(format!("{:?}", event));
        }))
    }

    #[test]
    fn reporter_without_callback_ignores_events() {
        let reporter = ProgressReporter::new();
        reporter.report(Progress::TaskIncrement);
    }

    #[test]
    fn phase_wraps_successful_body_in_start_and_finish() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let reporter = recording_reporter(log.clone());

        let value: Result<u32, ()> = reporter.phase("Planning", || Ok(3));

        assert_eq!(value, Ok(3));
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "PhaseStart { name: \"Planning\" }".to_string(),
                "PhaseFinish".to_string()
            ]
        );
    }

    #[test]
    fn phase_does_not_finish_when_body_fails() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let reporter = recording_reporter(log.clone());

        let value: Result<(), &str> = reporter.phase("Transferring", || Err("collision"));

        assert_eq!(value, Err("collision"));
        assert_eq!(log.lock().unwrap().len(), 1);
    }
}
