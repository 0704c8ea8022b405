use crossbeam_channel as channel;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
    thread,
    time::Duration,
};

use super::{
    control::{self, Control, Key, LedMode},
    protocol, Error, Event, EventSink, Mode,
};
use crate::midi::{self, transport::InputCallback, Msg, Output, Transport};

pub const DECK_TYPE: &str = "xtouchmini";

/// Device session configuration.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Listener idle poll interval, also the bound for a clean shutdown.
    pub timeout: Duration,
    /// Time the device needs to switch firmware mode.
    pub settle_delay: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            settle_delay: Duration::from_millis(500),
        }
    }
}

impl Settings {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }
}

type SharedSink = Arc<Mutex<Option<Box<dyn EventSink>>>>;

struct Listener {
    stop_tx: channel::Sender<()>,
    // Disconnected when the listener thread exits.
    done_rx: channel::Receiver<()>,
    handle: thread::JoinHandle<()>,
}

/// A session with a Behringer X-Touch Mini.
///
/// Opening the session switches the device to Makie mode. The device is
/// reverted to native mode when the session is stopped or dropped.
pub struct XTouchMini {
    name: Arc<str>,
    input_name: Arc<str>,
    transport: Arc<dyn Transport>,
    output: Mutex<Option<Box<dyn Output>>>,
    makie: Arc<AtomicBool>,
    sink: SharedSink,
    running: Arc<AtomicBool>,
    listener: Option<Listener>,
    settings: Settings,
}

impl XTouchMini {
    pub fn open(
        transport: impl Transport,
        output_name: &str,
        input_name: &str,
    ) -> Result<Self, Error> {
        Self::open_with(transport, Settings::default(), output_name, input_name)
    }

    pub fn open_with(
        transport: impl Transport,
        settings: Settings,
        output_name: &str,
        input_name: &str,
    ) -> Result<Self, Error> {
        let output =
            transport
                .open_output(output_name)
                .map_err(|source| Error::DeviceUnavailable {
                    port: output_name.into(),
                    source,
                })?;

        let mut this = Self {
            name: input_name.into(),
            input_name: input_name.into(),
            transport: Arc::new(transport),
            output: Mutex::new(Some(output)),
            makie: Arc::new(AtomicBool::new(false)),
            sink: Arc::new(Mutex::new(None)),
            running: Arc::new(AtomicBool::new(false)),
            listener: None,
            settings,
        };

        this.set_mode(Mode::Makie);

        Ok(this)
    }

    pub fn id(&self) -> &str {
        &self.name
    }

    pub fn deck_type(&self) -> &'static str {
        DECK_TYPE
    }

    pub fn serial_number(&self) -> &str {
        &self.input_name
    }

    pub fn key_names(&self) -> Vec<Control> {
        control::key_names()
    }

    pub fn is_visual(&self) -> bool {
        false
    }

    pub fn mode(&self) -> Mode {
        Mode::from_makie(self.makie.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.listener.is_some()
    }

    /// Registers the sink for the device events, replacing the previous one.
    pub fn set_sink(&self, sink: impl EventSink) {
        *self.sink.lock().unwrap_or_else(PoisonError::into_inner) = Some(Box::new(sink));
    }

    pub fn clear_sink(&self) {
        *self.sink.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Switches the device firmware mode and waits for the device to settle.
    pub fn set_mode(&mut self, mode: Mode) {
        log::debug!("{}: setting {mode:?} mode..", self.name);

        self.send(protocol::encode_mode_switch(mode.is_makie()), true);
        self.makie.store(mode.is_makie(), Ordering::Release);

        if !self.settings.settle_delay.is_zero() {
            thread::sleep(self.settings.settle_delay);
        }
    }

    /// Starts listening to the device.
    ///
    /// Returns once the input is open.
    pub fn start(&mut self) -> Result<(), Error> {
        if self.listener.is_some() {
            log::debug!("{}: already running", self.name);
            return Ok(());
        }

        if self.output.lock().unwrap().is_none() {
            return Err(Error::Closed);
        }

        log::debug!("{}: starting..", self.name);

        let (stop_tx, stop_rx) = channel::bounded(1);
        let (ready_tx, ready_rx) = channel::bounded(1);
        let (done_tx, done_rx) = channel::bounded(0);

        let loop_ = ListenerLoop {
            transport: self.transport.clone(),
            input_name: self.input_name.clone(),
            running: self.running.clone(),
            timeout: self.settings.timeout,
            stop_rx,
            ready_tx,
            _done_tx: done_tx,
        };
        let callback = self.input_callback();

        self.running.store(true, Ordering::Release);
        let handle = thread::Builder::new()
            .name("xtouch-mini listener".into())
            .spawn(move || loop_.run(callback))
            .map_err(|err| {
                self.running.store(false, Ordering::Release);
                Error::from(err)
            })?;

        let res = match ready_rx.recv_timeout(self.settings.timeout) {
            Ok(res) => res,
            Err(channel::RecvTimeoutError::Timeout) => {
                log::error!(
                    "{}: input not ready after {:?}",
                    self.name,
                    self.settings.timeout
                );
                // The listener exits on its own once the input opens.
                self.running.store(false, Ordering::Release);

                return Err(Error::DeviceUnavailable {
                    port: self.input_name.clone(),
                    source: midi::Error::Connection(self.input_name.clone()),
                });
            }
            Err(channel::RecvTimeoutError::Disconnected) => Err(midi::Error::NotConnected),
        };

        if let Err(source) = res {
            self.running.store(false, Ordering::Release);
            let _ = handle.join();

            return Err(Error::DeviceUnavailable {
                port: self.input_name.clone(),
                source,
            });
        }

        self.listener = Some(Listener {
            stop_tx,
            done_rx,
            handle,
        });

        log::debug!("{}: ..started", self.name);

        Ok(())
    }

    /// Stops listening, reverts the device to native mode and releases it.
    pub fn stop(&mut self) {
        let listener = match self.listener.take() {
            Some(listener) => listener,
            None => {
                log::debug!("{}: not running", self.name);
                return;
            }
        };

        let timeout = self.settings.timeout;
        log::debug!(
            "{}: stopping (wait can last up to {timeout:?})..",
            self.name
        );

        self.running.store(false, Ordering::Release);
        let _ = listener.stop_tx.try_send(());

        match listener.done_rx.recv_timeout(timeout) {
            Err(channel::RecvTimeoutError::Timeout) => {
                log::warn!("{}: {}", self.name, Error::ShutdownTimeout(timeout));
            }
            _ => {
                if listener.handle.join().is_err() {
                    log::error!("{}: listener panicked", self.name);
                }
            }
        }

        self.close_output();

        log::debug!("{}: ..stopped", self.name);
    }

    /// Sets the LED of button `key`.
    ///
    /// `blink` only applies when `on` is set.
    pub fn set_key(&self, key: Key, on: bool, blink: bool) {
        self.set_key_(key, on, blink, true);
    }

    /// Displays `value` (`0..=11`) on the LED ring of `encoder` (`0..=7`).
    ///
    /// Out of range values are clamped.
    pub fn set_control(&self, encoder: u8, value: i32, led_mode: LedMode) {
        self.set_control_(encoder, value, led_mode, true);
    }

    /// Turns off all the button LEDs and encoder rings.
    ///
    /// Debug logs are suppressed when `silent` is set.
    pub fn reset(&self, silent: bool) {
        let verbose = !silent;

        if verbose {
            log::debug!("{}: resetting..", self.name);
        }

        for key in Key::all() {
            self.set_key_(key, false, false, verbose);
        }

        for encoder in 0..control::ENCODER_LEN {
            self.set_control_(encoder, 0, LedMode::Single, verbose);
        }

        if verbose {
            log::debug!("{}: ..reset", self.name);
        }
    }

    /// Lights every key, sweeps all the encoder rings in every mode,
    /// blinks every key and then resets the device.
    pub fn self_test(&mut self) {
        const STEP: Duration = Duration::from_millis(200);
        const BLINK_DURATION: Duration = Duration::from_secs(2);

        log::debug!("{}: testing..", self.name);
        self.set_mode(Mode::Makie);

        log::debug!("{}: ..keys..", self.name);
        for key in Key::all() {
            self.set_key(key, true, false);
            thread::sleep(STEP);
        }

        log::debug!("{}: ..controls..", self.name);
        for value in 0..control::RING_LEN as i32 {
            for encoder in 0..control::ENCODER_LEN {
                let led_mode = LedMode::ALL[encoder as usize % LedMode::ALL.len()];
                self.set_control(encoder, value, led_mode);
            }
            thread::sleep(STEP);
        }

        log::debug!("{}: ..blink..", self.name);
        for key in Key::all() {
            self.set_key(key, true, true);
        }

        log::debug!("{}: ..reset in {BLINK_DURATION:?}..", self.name);
        thread::sleep(BLINK_DURATION);
        self.reset(true);

        log::debug!("{}: ..done", self.name);
    }
}

impl XTouchMini {
    fn set_key_(&self, key: Key, on: bool, blink: bool, verbose: bool) {
        match protocol::encode_key(key, on, blink) {
            Ok(msg) => self.send(msg, verbose),
            Err(err) => log::warn!("{}: set_key: {err}", self.name),
        }
    }

    fn set_control_(&self, encoder: u8, value: i32, led_mode: LedMode, verbose: bool) {
        if let Some(msg) = protocol::encode_control(encoder, value, led_mode) {
            self.send(msg, verbose);
        }
    }

    fn send(&self, msg: Msg, verbose: bool) {
        match self.output.lock().unwrap().as_mut() {
            Some(output) => {
                if verbose {
                    log::debug!("{}: sending '{msg}'", self.name);
                }

                if let Err(err) = output.send(&msg) {
                    log::error!("{}: failed to send '{msg}': {err}", self.name);
                }
            }
            None => log::debug!("{}: output closed, ignoring '{msg}'", self.name),
        }
    }

    fn close_output(&mut self) {
        let output = self.output.get_mut().unwrap().take();
        if let Some(mut output) = output {
            log::debug!("{}: reverting to native mode", self.name);

            let msg = protocol::encode_mode_switch(false);
            if let Err(err) = output.send(&msg) {
                log::error!("{}: failed to send '{msg}': {err}", self.name);
            }
            self.makie.store(false, Ordering::Release);

            output.close();
        }
    }

    fn input_callback(&self) -> InputCallback {
        let deck = self.name.clone();
        let makie = self.makie.clone();
        let sink = self.sink.clone();

        Box::new(move |msg| {
            log::trace!("{deck}: received '{msg}'");

            let mode = Mode::from_makie(makie.load(Ordering::Acquire));
            if let Some((key, state)) = protocol::decode(mode, &msg) {
                let mut sink = sink.lock().unwrap_or_else(PoisonError::into_inner);
                if let Some(sink) = sink.as_mut() {
                    sink.on_event(Event {
                        key,
                        state,
                        deck: deck.clone(),
                    });
                }
            }
        })
    }
}

impl Drop for XTouchMini {
    fn drop(&mut self) {
        if self.listener.is_some() {
            self.stop();
        } else {
            self.close_output();
        }
    }
}

struct ListenerLoop {
    transport: Arc<dyn Transport>,
    input_name: Arc<str>,
    running: Arc<AtomicBool>,
    timeout: Duration,
    stop_rx: channel::Receiver<()>,
    ready_tx: channel::Sender<Result<(), midi::Error>>,
    _done_tx: channel::Sender<()>,
}

impl ListenerLoop {
    fn run(self, callback: InputCallback) {
        log::debug!("Opening MIDI input '{}'..", self.input_name);

        let input = match self.transport.open_input(&self.input_name, callback) {
            Ok(input) => {
                log::debug!("..input '{}' opened", self.input_name);
                let _ = self.ready_tx.send(Ok(()));
                input
            }
            Err(err) => {
                log::error!("Couldn't open MIDI input '{}': {err}", self.input_name);
                let _ = self.ready_tx.send(Err(err));
                return;
            }
        };

        while self.running.load(Ordering::Acquire) {
            match self.stop_rx.recv_timeout(self.timeout) {
                Ok(()) | Err(channel::RecvTimeoutError::Disconnected) => break,
                Err(channel::RecvTimeoutError::Timeout) => (),
            }
        }

        input.close();
        log::debug!("Listener for '{}' exited", self.input_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ctrl_surf::event::state, midi::mock::Mock};
    use std::time::Instant;

    const OUT: &str = "X-TOUCH MINI out";
    const IN: &str = "X-TOUCH MINI in";
    const RECV_TIMEOUT: Duration = Duration::from_secs(2);

    fn settings() -> Settings {
        Settings::default()
            .with_timeout(Duration::from_secs(5))
            .with_settle_delay(Duration::ZERO)
    }

    fn open(mock: &Mock) -> XTouchMini {
        XTouchMini::open_with(mock.clone(), settings(), OUT, IN).unwrap()
    }

    fn channel_sink(session: &XTouchMini) -> channel::Receiver<Event> {
        let (tx, rx) = channel::unbounded();
        session.set_sink(move |event: Event| {
            let _ = tx.send(event);
        });

        rx
    }

    #[test]
    fn open_switches_to_makie() {
        let mock = Mock::default();
        let session = open(&mock);

        assert_eq!(mock.sent(), vec![Msg::control_change(127, 1)]);
        assert_eq!(session.mode(), Mode::Makie);
        assert!(mock.is_output_open());
        assert!(!session.is_running());
        assert_eq!(mock.input_opens(), 0);
    }

    #[test]
    fn open_unavailable_output() {
        let res = XTouchMini::open_with(Mock::failing_output(), settings(), OUT, IN);

        assert!(matches!(res, Err(Error::DeviceUnavailable { .. })));
    }

    #[test]
    fn metadata() {
        let mock = Mock::default();
        let session = open(&mock);

        assert_eq!(session.id(), IN);
        assert_eq!(session.serial_number(), IN);
        assert_eq!(session.deck_type(), "xtouchmini");
        assert!(!session.is_visual());
        assert_eq!(session.key_names().len(), 24);
    }

    #[test]
    fn start_is_idempotent() {
        let mock = Mock::default();
        let mut session = open(&mock);

        session.start().unwrap();
        session.start().unwrap();

        assert!(session.is_running());
        assert_eq!(mock.input_opens(), 1);

        session.stop();
        assert_eq!(mock.input_closes(), 1);
    }

    #[test]
    fn stop_without_start() {
        let mock = Mock::default();
        let mut session = open(&mock);
        mock.clear_sent();

        session.stop();

        assert!(mock.sent().is_empty());
        assert!(mock.is_output_open());
        assert_eq!(session.mode(), Mode::Makie);
    }

    #[test]
    fn start_unavailable_input() {
        let mock = Mock::default();
        mock.fail_input();
        let mut session = open(&mock);

        assert!(matches!(
            session.start(),
            Err(Error::DeviceUnavailable { .. })
        ));
        assert!(!session.is_running());
        assert_eq!(mock.input_opens(), 0);

        // Output still usable
        session.set_key(Key::Index(1), true, false);
        assert_eq!(mock.sent().last(), Some(&Msg::note_on(90, 127)));
    }

    #[test]
    fn button_press_reaches_sink() {
        let mock = Mock::default();
        let mut session = open(&mock);
        let events = channel_sink(&session);

        session.start().unwrap();
        assert!(mock.inject(Msg::note_on(89, 127)));

        let event = events.recv_timeout(RECV_TIMEOUT).unwrap();
        assert_eq!(event.key, Control::Button(Key::Index(0)));
        assert_eq!(event.state, state::PRESSED);
        assert_eq!(event.deck.as_ref(), IN);

        assert!(mock.inject(Msg::note_on(89, 0)));
        let event = events.recv_timeout(RECV_TIMEOUT).unwrap();
        assert_eq!(event.state, state::RELEASED);

        session.stop();
    }

    #[test]
    fn unassigned_codes_reach_sink() {
        let mock = Mock::default();
        let mut session = open(&mock);
        let events = channel_sink(&session);

        session.start().unwrap();
        mock.inject(Msg::note_on(0, 127));
        mock.inject(Msg::control_change(100, 1));
        mock.inject(Msg::control_change(60, 65));
        mock.inject(Msg::control_change(10, 99));

        let expected = [
            (Control::Note(0), state::PRESSED),
            (Control::Controller(100), state::INCREMENT),
            (Control::Controller(60), state::DECREMENT),
            (Control::Slider(Key::B), 99),
        ];
        for (key, state) in expected {
            let event = events.recv_timeout(RECV_TIMEOUT).unwrap();
            assert_eq!(event.key, key);
            assert_eq!(event.state, state);
        }
        assert!(events.try_recv().is_err());

        session.stop();
    }

    #[test]
    fn panicking_sink_does_not_poison_the_session() {
        let mock = Mock::default();
        let session = open(&mock);
        let mut callback = session.input_callback();

        session.set_sink(|event: Event| {
            if event.state >= 0 {
                panic!("sink failure");
            }
        });
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            callback(Msg::note_on(89, 127))
        }));
        assert!(res.is_err());
        assert!(session.sink.is_poisoned());

        let events = channel_sink(&session);
        callback(Msg::note_on(90, 127));

        let event = events.recv_timeout(RECV_TIMEOUT).unwrap();
        assert_eq!(event.key, Control::Button(Key::Index(1)));

        session.clear_sink();
        callback(Msg::note_on(90, 127));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn events_without_sink_are_dropped() {
        let mock = Mock::default();
        let mut session = open(&mock);

        session.start().unwrap();
        assert!(mock.inject(Msg::note_on(89, 127)));

        let events = channel_sink(&session);
        session.clear_sink();
        assert!(mock.inject(Msg::note_on(89, 127)));
        assert!(events.try_recv().is_err());

        session.stop();
    }

    #[test]
    fn sink_is_replaced() {
        let mock = Mock::default();
        let mut session = open(&mock);
        let first = channel_sink(&session);
        let second = channel_sink(&session);

        session.start().unwrap();
        mock.inject(Msg::control_change(16, 0x41));

        let event = second.recv_timeout(RECV_TIMEOUT).unwrap();
        assert_eq!(event.key, Control::Encoder(0));
        assert_eq!(event.state, state::DECREMENT);
        assert!(first.try_recv().is_err());

        session.stop();
    }

    #[test]
    fn native_mode_decoding() {
        let mock = Mock::default();
        let mut session = open(&mock);
        session.set_mode(Mode::Native);
        let events = channel_sink(&session);

        session.start().unwrap();
        mock.inject(Msg::note_on(89, 1));
        mock.inject(Msg::pitch_wheel(midi::Channel::new(8), 100));
        mock.inject(Msg::control_change(2, 3));

        let event = events.recv_timeout(RECV_TIMEOUT).unwrap();
        assert_eq!(event.key, Control::Button(Key::Index(0)));
        assert_eq!(event.state, state::PRESSED);

        let event = events.recv_timeout(RECV_TIMEOUT).unwrap();
        assert_eq!(event.key, Control::Encoder(1));
        assert_eq!(event.state, state::INCREMENT);

        session.stop();
    }

    #[test]
    fn set_control_and_keys() {
        let mock = Mock::default();
        let session = open(&mock);
        mock.clear_sent();

        session.set_control(2, 5, LedMode::Fan);
        session.set_control(8, 5, LedMode::Fan);
        session.set_control(0, 42, LedMode::Trim);
        session.set_key(Key::A, true, true);
        session.set_key(Key::Index(16), true, false);

        assert_eq!(
            mock.sent(),
            vec![
                Msg::control_change(50, 37),
                Msg::control_change(48, 16 + 11),
                Msg::note_on(84, 1),
            ]
        );
    }

    #[test]
    fn reset_turns_everything_off() {
        let mock = Mock::default();
        let session = open(&mock);
        mock.clear_sent();

        session.reset(true);

        let sent = mock.sent();
        assert_eq!(sent.len(), 18 + 8);
        for key in Key::all() {
            let note = control::to_raw(Control::Button(key), Mode::Makie).unwrap();
            assert!(sent.contains(&Msg::note_on(note, 0)));
        }
        for encoder in 0..8 {
            assert!(sent.contains(&Msg::control_change(48 + encoder, 0)));
        }
    }

    #[test]
    fn stop_reverts_mode_and_releases_output() {
        let mock = Mock::default();
        let mut session = open(&mock);
        session.start().unwrap();
        mock.clear_sent();

        let now = Instant::now();
        session.stop();
        assert!(now.elapsed() < Duration::from_secs(2));

        assert_eq!(mock.sent(), vec![Msg::control_change(127, 0)]);
        assert!(!mock.is_output_open());
        assert!(!mock.is_input_open());
        assert!(!session.is_running());
        assert_eq!(session.mode(), Mode::Native);

        // Sending on the released output is a no-op
        session.set_key(Key::Index(0), true, false);
        assert_eq!(mock.sent().len(), 1);

        session.stop();
        assert!(matches!(session.start(), Err(Error::Closed)));
    }

    #[test]
    fn stop_gives_up_on_stalled_listener() {
        let mock = Mock::default();
        let timeout = Duration::from_millis(200);
        let mut session =
            XTouchMini::open_with(mock.clone(), settings().with_timeout(timeout), OUT, IN)
                .unwrap();
        session.start().unwrap();
        mock.stall_input_close(Duration::from_secs(2));
        mock.clear_sent();

        let now = Instant::now();
        session.stop();
        let elapsed = now.elapsed();
        assert!(elapsed >= timeout);
        assert!(elapsed < Duration::from_secs(1));

        assert_eq!(mock.sent().last(), Some(&Msg::control_change(127, 0)));
        assert!(!mock.is_output_open());
        assert!(!session.is_running());
        assert_eq!(session.mode(), Mode::Native);
    }

    #[test]
    fn start_gives_up_on_stalled_input() {
        let mock = Mock::default();
        let timeout = Duration::from_millis(200);
        let mut session =
            XTouchMini::open_with(mock.clone(), settings().with_timeout(timeout), OUT, IN)
                .unwrap();
        mock.stall_input_open(Duration::from_secs(2));

        let now = Instant::now();
        assert!(matches!(
            session.start(),
            Err(Error::DeviceUnavailable { .. })
        ));
        assert!(now.elapsed() < Duration::from_secs(1));
        assert!(!session.is_running());

        // Output still usable
        session.set_key(Key::A, true, false);
        assert_eq!(mock.sent().last(), Some(&Msg::note_on(84, 127)));
    }

    #[test]
    fn drop_reverts_mode() {
        let mock = Mock::default();
        let session = open(&mock);
        drop(session);

        assert_eq!(mock.sent().last(), Some(&Msg::control_change(127, 0)));
        assert!(!mock.is_output_open());

        let mock = Mock::default();
        let mut session = open(&mock);
        session.start().unwrap();
        drop(session);

        assert_eq!(mock.sent().last(), Some(&Msg::control_change(127, 0)));
        assert!(!mock.is_output_open());
        assert_eq!(mock.input_closes(), 1);
    }
}
