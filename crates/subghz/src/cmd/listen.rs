use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use subghz_frame::SubGhzFrame;
use subghz_link::LinkError;
use tracing::warn;

use crate::cmd::ListenArgs;
use crate::exit::{link_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_frame, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let interface = args.port.open()?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let senders: Option<Vec<String>> = args
        .senders
        .map(|list| list.iter().map(|s| normalize_sender(s)).collect());
    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        let frame = match interface.try_take_received_frame(POLL_INTERVAL) {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(LinkError::Frame(err)) => {
                warn!(error = %err, "skipping undecodable frame");
                continue;
            }
            Err(err) => return Err(link_error("receive failed", err)),
        };

        if let Some(senders) = &senders {
            if !senders.iter().any(|s| s == frame.sender()) {
                continue;
            }
        }

        print_frame(&frame, format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                break;
            }
        }
    }

    interface.close();
    Ok(SUCCESS)
}

// Frames report senders as lowercase hex without leading zeros.
fn normalize_sender(sender: &str) -> String {
    let trimmed = sender.trim().trim_start_matches('0').to_ascii_lowercase();
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
