mod config;
mod error;
mod protocol;
mod shutdown;

use anyhow::Result;
use layout_engine::LayoutWorker;
use log::{debug, error, info};
use std::{
    io::{self, BufRead, Write},
    sync::mpsc::{self, Receiver, Sender},
    thread::Builder,
};

/// What the main loop waits on
enum Event {
    Request(String),
    Eof,
    Shutdown,
}

fn main() -> Result<()> {
    // Initialize logger - defaults to RUST_LOG if set, otherwise INFO
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let config = config::WorkerConfig::from_env()?;
    let engine_config = config.engine_config()?;
    info!("Layout worker starting...");
    match &config.engine_config_path {
        Some(path) => info!("Engine config: {}", path.display()),
        None => info!("Engine config: defaults"),
    }

    let mut dispatcher = protocol::Dispatcher::new(LayoutWorker::new(engine_config));
    let search = &dispatcher.worker().config().search;
    info!(
        "Search: allow_expand={}, tie_break={:?}, stop_after={:?}",
        search.allow_expand, search.tie_break, search.stop_after
    );

    let (events, inbox) = mpsc::channel();
    let signal_events = events.clone();
    shutdown::setup_exit_handler(move || {
        let _ = signal_events.send(Event::Shutdown);
    })?;
    spawn_reader(events)?;

    let handled = serve(&inbox, &mut dispatcher, &mut io::stdout().lock())?;
    info!("Layout worker stopped after {handled} requests");
    Ok(())
}

/// Forwards stdin lines to the main loop until EOF.
fn spawn_reader(events: Sender<Event>) -> io::Result<()> {
    Builder::new().name("stdin-reader".into()).spawn(move || {
        for line in io::stdin().lock().lines() {
            let event = match line {
                Ok(line) => Event::Request(line),
                Err(e) => {
                    error!("Failed to read request: {e}");
                    break;
                }
            };
            if events.send(event).is_err() {
                return;
            }
        }
        let _ = events.send(Event::Eof);
    })?;
    Ok(())
}

/// Answers requests in arrival order. Everything queued before a shutdown
/// event gets its response; the loop stops at the shutdown.
fn serve(
    inbox: &Receiver<Event>,
    dispatcher: &mut protocol::Dispatcher,
    out: &mut impl Write,
) -> Result<usize> {
    let mut handled = 0usize;

    for event in inbox {
        let line = match event {
            Event::Request(line) => line,
            Event::Eof => break,
            Event::Shutdown => {
                info!("Received exit signal, stopping...");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = dispatcher.handle_line(&line);
        serde_json::to_writer(&mut *out, &response)?;
        out.write_all(b"\n")?;
        out.flush()?;

        handled += 1;
        debug!("Requests handled: {handled}");
    }

    Ok(handled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn request(id: u64) -> String {
        json!({
            "context": { "requestId": id },
            "command": "buildLayout",
            "data": {
                "metaInfo": [{ "type": "article", "root": true }],
                "instanceMap": { "article": [] },
                "config": { "colspan": 1 },
                "textViewMetrics": { "columnsHeight": 1000, "lineHeight": 20 }
            }
        })
        .to_string()
    }

    fn responses(out: &[u8]) -> Vec<Value> {
        String::from_utf8_lossy(out)
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_requests_before_shutdown_are_answered() {
        let (events, inbox) = mpsc::channel();
        events.send(Event::Request(request(1))).unwrap();
        events.send(Event::Request(String::new())).unwrap();
        events.send(Event::Request(request(2))).unwrap();
        events.send(Event::Shutdown).unwrap();
        events.send(Event::Request(request(3))).unwrap();

        let mut out = Vec::new();
        let handled = serve(&inbox, &mut protocol::Dispatcher::default(), &mut out).unwrap();

        assert_eq!(handled, 2);
        let answered = responses(&out);
        assert_eq!(answered.len(), 2);
        assert_eq!(answered[0]["context"]["requestId"], json!(1));
        assert_eq!(answered[1]["context"]["requestId"], json!(2));
        assert_eq!(answered[1]["status"], json!("__success__"));
    }

    #[test]
    fn test_eof_and_closed_channel_stop_the_loop() {
        let (events, inbox) = mpsc::channel();
        events.send(Event::Request("{broken".to_string())).unwrap();
        events.send(Event::Eof).unwrap();
        events.send(Event::Request(request(9))).unwrap();

        let mut out = Vec::new();
        let handled = serve(&inbox, &mut protocol::Dispatcher::default(), &mut out).unwrap();
        assert_eq!(handled, 1);
        assert_eq!(responses(&out)[0]["status"], json!("__error__"));

        let (events, inbox) = mpsc::channel::<Event>();
        drop(events);
        let handled = serve(&inbox, &mut protocol::Dispatcher::default(), &mut Vec::new()).unwrap();
        assert_eq!(handled, 0);
    }
}
