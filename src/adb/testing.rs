use crate::adb::client::AdbRunner;
use crate::core::error::Result;
use async_trait::async_trait;
use std::sync::Mutex;

type Responder = Box<dyn Fn(&[&str]) -> Result<String> + Send + Sync>;

/// Records every invocation and answers with a canned closure.
pub(crate) struct FakeRunner {
    respond: Responder,
    calls: Mutex<Vec<Vec<String>>>,
    serial: Option<String>,
}

impl FakeRunner {
    pub(crate) fn with(respond: impl Fn(&[&str]) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
            serial: None,
        }
    }

    pub(crate) fn ok(output: &str) -> Self {
        let output = output.to_string();
        Self::with(move |_| Ok(output.clone()))
    }

    pub(crate) fn targeting(mut self, serial: &str) -> Self {
        self.serial = Some(serial.to_string());
        self
    }

    pub(crate) fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AdbRunner for FakeRunner {
    async fn run(&self, args: &[&str]) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push(args.iter().map(|s| s.to_string()).collect());
        (self.respond)(args)
    }

    fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }
}
