//! Alert backends for the terminal host.
//!
//! The default backend rings the terminal bell. With the `rodio` feature the
//! configured sound file is played on a dedicated audio thread, since the
//! output stream cannot leave the thread that opened it.

use std::io::Write;

use tomate_core::{AlertHandle, AlertSound, AudioError};

#[derive(Debug, Default)]
pub struct BellAlert {
    next: u64,
}

impl AlertSound for BellAlert {
    fn play(&mut self, _resource: &str) -> Result<AlertHandle, AudioError> {
        let mut err = std::io::stderr();
        err.write_all(b"\x07")
            .and_then(|_| err.flush())
            .map_err(|e| AudioError::PlaybackFailed(e.to_string()))?;
        self.next += 1;
        Ok(AlertHandle(self.next))
    }

    fn stop(&mut self, _handle: AlertHandle) -> Result<(), AudioError> {
        // A bell cannot be stopped once rung.
        Ok(())
    }
}

#[cfg(feature = "rodio")]
mod speaker {
    use std::collections::HashMap;
    use std::fs::File;
    use std::io::BufReader;
    use std::path::PathBuf;
    use std::sync::mpsc::{self, Sender};
    use std::thread;

    use rodio::{Decoder, OutputStream, Sink};
    use tomate_core::{AlertHandle, AlertSound, AudioError};
    use tracing::warn;

    enum AudioCommand {
        Play { id: u64, path: PathBuf },
        Stop(u64),
    }

    #[derive(Debug)]
    pub struct RodioAlert {
        tx: Sender<AudioCommand>,
        base: PathBuf,
        next: u64,
    }

    impl std::fmt::Debug for AudioCommand {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                AudioCommand::Play { id, path } => write!(f, "Play({id}, {})", path.display()),
                AudioCommand::Stop(id) => write!(f, "Stop({id})"),
            }
        }
    }

    impl RodioAlert {
        /// Spawn the audio thread. Sound resources are resolved against `base`.
        pub fn spawn(base: PathBuf) -> Result<Self, AudioError> {
            let (tx, rx) = mpsc::channel::<AudioCommand>();
            thread::Builder::new()
                .name("tomate-audio".to_string())
                .spawn(move || {
                    let (_stream, output) = match OutputStream::try_default() {
                        Ok(pair) => pair,
                        Err(e) => {
                            warn!(error = %e, "no audio output device");
                            return;
                        }
                    };
                    let mut sinks: HashMap<u64, Sink> = HashMap::new();

                    while let Ok(cmd) = rx.recv() {
                        match cmd {
                            AudioCommand::Play { id, path } => {
                                let source = File::open(&path)
                                    .map_err(|e| e.to_string())
                                    .and_then(|f| {
                                        Decoder::new(BufReader::new(f)).map_err(|e| e.to_string())
                                    });
                                let sink = Sink::try_new(&output).map_err(|e| e.to_string());
                                match (source, sink) {
                                    (Ok(source), Ok(sink)) => {
                                        sink.append(source);
                                        sinks.insert(id, sink);
                                    }
                                    (Err(e), _) | (_, Err(e)) => {
                                        warn!(path = %path.display(), error = %e, "alert playback failed");
                                    }
                                }
                            }
                            AudioCommand::Stop(id) => {
                                if let Some(sink) = sinks.remove(&id) {
                                    sink.stop();
                                }
                            }
                        }
                    }
                })
                .map_err(|e| AudioError::Unavailable(e.to_string()))?;

            Ok(Self { tx, base, next: 0 })
        }
    }

    impl AlertSound for RodioAlert {
        fn play(&mut self, resource: &str) -> Result<AlertHandle, AudioError> {
            let path = self.base.join(resource);
            if !path.is_file() {
                return Err(AudioError::Unavailable(format!(
                    "{} not found",
                    path.display()
                )));
            }
            self.next += 1;
            self.tx
                .send(AudioCommand::Play {
                    id: self.next,
                    path,
                })
                .map_err(|e| AudioError::PlaybackFailed(e.to_string()))?;
            Ok(AlertHandle(self.next))
        }

        fn stop(&mut self, handle: AlertHandle) -> Result<(), AudioError> {
            self.tx
                .send(AudioCommand::Stop(handle.0))
                .map_err(|e| AudioError::PlaybackFailed(e.to_string()))
        }
    }
}

/// The backend chosen at startup.
#[derive(Debug)]
pub enum HostAlert {
    Bell(BellAlert),
    #[cfg(feature = "rodio")]
    Speaker(speaker::RodioAlert),
}

impl HostAlert {
    pub fn detect() -> Self {
        #[cfg(feature = "rodio")]
        {
            let spawned = tomate_core::storage::data_dir()
                .map_err(|e| AudioError::Unavailable(e.to_string()))
                .and_then(speaker::RodioAlert::spawn);
            match spawned {
                Ok(speaker) => return HostAlert::Speaker(speaker),
                Err(e) => tracing::warn!(error = %e, "falling back to terminal bell"),
            }
        }
        HostAlert::Bell(BellAlert::default())
    }
}

impl AlertSound for HostAlert {
    fn play(&mut self, resource: &str) -> Result<AlertHandle, AudioError> {
        match self {
            HostAlert::Bell(bell) => bell.play(resource),
            #[cfg(feature = "rodio")]
            HostAlert::Speaker(speaker) => speaker.play(resource),
        }
    }

    fn stop(&mut self, handle: AlertHandle) -> Result<(), AudioError> {
        match self {
            HostAlert::Bell(bell) => bell.stop(handle),
            #[cfg(feature = "rodio")]
            HostAlert::Speaker(speaker) => speaker.stop(handle),
        }
    }
}
