use std::{
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

use super::{transport::InputCallback, Error, Input, Msg, Output, Transport};

#[derive(Default)]
struct State {
    sent: Vec<Msg>,
    output_open: bool,
    input_opens: usize,
    input_closes: usize,
    callback: Option<InputCallback>,
    fail_output: bool,
    fail_input: bool,
    input_open_delay: Duration,
    input_close_delay: Duration,
}

/// Test double recording outbound traffic and injecting inbound messages.
#[derive(Clone, Default)]
pub struct Mock {
    state: Arc<Mutex<State>>,
}

impl Mock {
    pub fn failing_output() -> Self {
        let this = Self::default();
        this.state.lock().unwrap().fail_output = true;
        this
    }

    pub fn fail_input(&self) {
        self.state.lock().unwrap().fail_input = true;
    }

    /// Delays `open_input` by `delay`.
    pub fn stall_input_open(&self, delay: Duration) {
        self.state.lock().unwrap().input_open_delay = delay;
    }

    /// Delays closing the input by `delay`.
    pub fn stall_input_close(&self, delay: Duration) {
        self.state.lock().unwrap().input_close_delay = delay;
    }

    pub fn sent(&self) -> Vec<Msg> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn clear_sent(&self) {
        self.state.lock().unwrap().sent.clear();
    }

    pub fn is_output_open(&self) -> bool {
        self.state.lock().unwrap().output_open
    }

    pub fn input_opens(&self) -> usize {
        self.state.lock().unwrap().input_opens
    }

    pub fn input_closes(&self) -> usize {
        self.state.lock().unwrap().input_closes
    }

    pub fn is_input_open(&self) -> bool {
        self.state.lock().unwrap().callback.is_some()
    }

    /// Delivers `msg` as if it was received from the device.
    ///
    /// Returns `false` if no input is open.
    pub fn inject(&self, msg: Msg) -> bool {
        let mut callback = match self.state.lock().unwrap().callback.take() {
            Some(callback) => callback,
            None => return false,
        };

        callback(msg);

        let mut state = self.state.lock().unwrap();
        if state.callback.is_none() && state.input_opens > state.input_closes {
            state.callback = Some(callback);
        }

        true
    }
}

impl Transport for Mock {
    fn open_output(&self, port_name: &str) -> Result<Box<dyn Output>, Error> {
        let mut state = self.state.lock().unwrap();
        if state.fail_output {
            return Err(Error::PortNotFound(port_name.into()));
        }
        state.output_open = true;

        Ok(Box::new(MockOutput {
            state: self.state.clone(),
        }))
    }

    fn open_input(
        &self,
        port_name: &str,
        callback: InputCallback,
    ) -> Result<Box<dyn Input>, Error> {
        let delay = self.state.lock().unwrap().input_open_delay;
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        let mut state = self.state.lock().unwrap();
        if state.fail_input {
            return Err(Error::PortNotFound(port_name.into()));
        }
        state.input_opens += 1;
        state.callback = Some(callback);

        Ok(Box::new(MockInput {
            state: self.state.clone(),
        }))
    }
}

struct MockOutput {
    state: Arc<Mutex<State>>,
}

impl Output for MockOutput {
    fn send(&mut self, msg: &Msg) -> Result<(), Error> {
        self.state.lock().unwrap().sent.push(*msg);
        Ok(())
    }

    fn close(self: Box<Self>) {
        self.state.lock().unwrap().output_open = false;
    }
}

struct MockInput {
    state: Arc<Mutex<State>>,
}

impl Input for MockInput {
    fn close(self: Box<Self>) {
        let delay = self.state.lock().unwrap().input_close_delay;
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        let mut state = self.state.lock().unwrap();
        state.input_closes += 1;
        state.callback = None;
    }
}
