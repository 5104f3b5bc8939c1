use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvError, Sender};
use crossterm::event::{self as term, KeyEvent, KeyEventKind};

/// Input for the dashboard loop.
#[derive(Debug)]
pub enum Input {
    Key(KeyEvent),
    /// Terminal size changed; the next draw picks it up.
    Resized,
    /// Redraw from the latest published window.
    Refresh,
}

/// Terminal input pump.
///
/// A background thread forwards key presses and resizes, and emits
/// [`Input::Refresh`] once per refresh period. The thread stops when the
/// pump is dropped or the receiving side goes away.
pub struct InputPump {
    rx: Receiver<Input>,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl InputPump {
    pub fn start(refresh: Duration) -> io::Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("nfstv-input".into())
            .spawn(move || pump(&tx, refresh, &flag))?;

        Ok(Self {
            rx,
            stop,
            handle: Some(handle),
        })
    }

    /// Block until the next input.
    pub fn next(&self) -> Result<Input, RecvError> {
        self.rx.recv()
    }
}

impl Drop for InputPump {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn pump(tx: &Sender<Input>, refresh: Duration, stop: &AtomicBool) {
    let mut next_refresh = Instant::now() + refresh;
    while !stop.load(Ordering::Relaxed) {
        let wait = next_refresh.saturating_duration_since(Instant::now());
        let input = match term::poll(wait) {
            Ok(true) => match term::read() {
                // Release and repeat events would double-trigger on some terminals.
                Ok(term::Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    Some(Input::Key(key))
                }
                Ok(term::Event::Resize(..)) => Some(Input::Resized),
                _ => None,
            },
            Ok(false) => None,
            // No controlling terminal; keep refreshing on schedule.
            Err(_) => {
                thread::sleep(wait);
                None
            }
        };
        if let Some(input) = input {
            if tx.send(input).is_err() {
                return;
            }
        }
        if Instant::now() >= next_refresh {
            if tx.send(Input::Refresh).is_err() {
                return;
            }
            next_refresh = Instant::now() + refresh;
        }
    }
}
