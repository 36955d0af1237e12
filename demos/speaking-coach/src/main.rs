//! Console speaking-practice session.
//!
//! Usage: `speaking-coach [config.json] [--list-devices]`
//!
//! The API key is read from `GEMINI_API_KEY`. Press Ctrl+C to end the session.

use std::error::Error;
use std::fs;
use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

use live_session_core::{LiveSession, MicrophoneProvider, SessionConfiguration, SessionDelegate, SessionState};
use live_session_native::permissions::check_microphone_permission;
use live_session_native::{CpalMicrophone, CpalPlaybackOutput, DeviceEnumerator, WebSocketTransport};

/// Prints transcript deltas and speaking indicators to stdout.
#[derive(Default)]
struct ConsoleDelegate {
    printed: Mutex<(usize, usize)>,
}

impl ConsoleDelegate {
    fn print_delta(label: &str, text: &str, printed: &mut usize) {
        if text.len() < *printed {
            *printed = 0;
        }
        let delta = text.get(*printed..).unwrap_or_default();
        if !delta.trim().is_empty() {
            println!("{label}: {}", delta.trim());
            let _ = std::io::stdout().flush();
        }
        *printed = text.len();
    }
}

impl SessionDelegate for ConsoleDelegate {
    fn on_transcription_update(&self, input: &str, output: &str) {
        let mut printed = self.printed.lock();
        Self::print_delta("  you", input, &mut printed.0);
        Self::print_delta("coach", output, &mut printed.1);
    }

    fn on_turn_complete(&self, final_student_text: &str) {
        *self.printed.lock() = (0, 0);
        log::debug!("turn complete: {:?}", final_student_text);
        println!("--- turn complete ---");
    }

    fn on_ai_start_speaking(&self) {
        println!("[coach speaking]");
    }

    fn on_ai_stop_speaking(&self) {
        println!("[coach finished]");
    }

    fn on_error(&self, message: &str) {
        eprintln!("error: {message}");
    }

    fn on_close(&self) {
        println!("session closed");
    }

    fn on_state_changed(&self, state: SessionState) {
        log::info!("session state: {}", state.as_str());
    }
}

fn list_devices() -> Result<(), Box<dyn Error>> {
    let enumerator = DeviceEnumerator::new();
    println!("Microphones:");
    for device in enumerator.list_input_devices()? {
        let marker = if device.is_default { " (default)" } else { "" };
        println!("  {}{}", device.name, marker);
    }
    println!("Outputs:");
    for device in enumerator.list_output_devices()? {
        let marker = if device.is_default { " (default)" } else { "" };
        println!("  {}{}", device.name, marker);
    }
    Ok(())
}

fn load_config(path: Option<&str>) -> Result<SessionConfiguration, Box<dyn Error>> {
    let mut config = match path {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => SessionConfiguration::default(),
    };
    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        config.api_key = Some(key);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--list-devices") {
        return list_devices();
    }

    let config = load_config(args.iter().find(|a| !a.starts_with("--")).map(String::as_str))?;
    if config.api_key.is_none() {
        log::warn!("GEMINI_API_KEY is not set; the endpoint will likely reject the session");
    }

    if !check_microphone_permission()? {
        eprintln!("Microphone access is unavailable. Check your system privacy settings.");
        return Ok(());
    }

    let microphone = CpalMicrophone::with_device(config.microphone_device.clone());
    if !microphone.is_available() {
        eprintln!(
            "Microphone '{}' was not found. Run with --list-devices to see what is available.",
            config.microphone_device.as_deref().unwrap_or("default")
        );
        return Ok(());
    }
    let output = CpalPlaybackOutput::with_device(config.output_device.clone());
    let transport = WebSocketTransport::new(&config);
    let delegate = Arc::new(ConsoleDelegate::default());

    let handle = LiveSession::start(config, microphone, output, transport, delegate).await?;
    println!("Connected (session {}). Start speaking; Ctrl+C to stop.", handle.id());

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            println!();
            handle.close().await;
        }
        _ = handle.wait_closed() => {}
    }

    let diagnostics = handle.diagnostics();
    log::info!(
        "sent {} chunks ({} dropped), {} turns, {} interruptions",
        diagnostics.chunks_sent,
        diagnostics.chunks_dropped,
        diagnostics.turns_completed,
        diagnostics.interruptions
    );
    for line in handle.history() {
        println!("{line}");
    }

    match handle.last_error() {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
