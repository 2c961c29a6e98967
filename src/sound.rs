//! Typewriter sound
//!
//! The audio runs on a dedicated thread since rodio's OutputStream is not Send.

use std::io::Cursor;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use rodio::{OutputStream, OutputStreamHandle, Sink};
use thiserror::Error;

use pet_core::{Pulse, PulseError};

#[derive(Error, Debug)]
pub enum SoundError {
    #[error("Sound file not found: {0}")]
    Missing(String),
    #[error("Failed to read sound file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode sound file: {0}")]
    Decode(#[from] rodio::decoder::DecoderError),
    #[error("Failed to start audio thread: {0}")]
    Thread(String),
}

/// Commands sent to the audio thread
enum SoundCommand {
    Click,
    Shutdown,
}

/// Plays a short clip for every revealed character.
pub struct TypewriterSound {
    sender: Sender<SoundCommand>,
    thread: Option<JoinHandle<()>>,
}

impl TypewriterSound {
    /// Load `path` and start the audio thread.
    ///
    /// The clip is decoded once up front so a broken file fails here rather
    /// than on every character.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SoundError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SoundError::Missing(path.display().to_string()));
        }
        let data = std::fs::read(path)?;
        rodio::Decoder::new(Cursor::new(data.clone()))?;

        let (sender, receiver) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("typewriter-sound".to_string())
            .spawn(move || audio_thread_main(data, receiver))
            .map_err(|e| SoundError::Thread(e.to_string()))?;

        log::info!("Typewriter sound loaded: {}", path.display());
        Ok(Self {
            sender,
            thread: Some(thread),
        })
    }
}

impl Pulse for TypewriterSound {
    fn pulse(&mut self) -> Result<(), PulseError> {
        self.sender
            .send(SoundCommand::Click)
            .map_err(|_| PulseError::Playback("audio thread has stopped".to_string()))
    }
}

impl Drop for TypewriterSound {
    fn drop(&mut self) {
        let _ = self.sender.send(SoundCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Audio thread main function
fn audio_thread_main(data: Vec<u8>, rx: Receiver<SoundCommand>) {
    // Without an output device the thread keeps draining clicks so the
    // revealer never sees an error per character.
    let output = match OutputStream::try_default() {
        Ok(output) => Some(output),
        Err(e) => {
            log::warn!("No audio output, typewriter sound disabled: {}", e);
            None
        }
    };

    // The clip of the previous character, cut off by the next one
    let mut current: Option<Sink> = None;

    while let Ok(cmd) = rx.recv() {
        match cmd {
            SoundCommand::Click => {
                if let Some(sink) = current.take() {
                    sink.stop();
                }
                if let Some((_, handle)) = output.as_ref() {
                    current = play_clip(handle, &data);
                }
            }
            SoundCommand::Shutdown => break,
        }
    }
    log::debug!("Audio thread exited");
}

fn play_clip(handle: &OutputStreamHandle, data: &[u8]) -> Option<Sink> {
    let source = match rodio::Decoder::new(Cursor::new(data.to_vec())) {
        Ok(source) => source,
        Err(e) => {
            log::warn!("Failed to decode typewriter sound: {}", e);
            return None;
        }
    };
    let sink = match Sink::try_new(handle) {
        Ok(sink) => sink,
        Err(e) => {
            log::warn!("Failed to play typewriter sound: {}", e);
            return None;
        }
    };
    sink.append(source);
    Some(sink)
}
