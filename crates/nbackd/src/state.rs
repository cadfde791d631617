use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;

use nback::clock::{SessionClock, SessionEvent, SharedSession, DEFAULT_EVENT_CAPACITY};
use nback::session::Session;
use nback::settings::{Settings, ThemePreset};
use nback::Error;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::time;
use tracing::{error, info, warn};

use crate::paths::AppPaths;
use crate::protocol::{Request, Response};

/// Everything the daemon serves: one session, its clock, and where the
/// settings token lives.
pub struct DaemonState {
    session: SharedSession,
    clock: Mutex<SessionClock>,
    events: broadcast::Sender<SessionEvent>,
    paths: AppPaths,
}

impl DaemonState {
    pub fn new(paths: AppPaths) -> Self {
        let (events, _) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        Self {
            session: Arc::new(RwLock::new(Session::default())),
            clock: Mutex::new(SessionClock::with_sender(events.clone())),
            events,
            paths,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Load the persisted token. `Ok(false)` when there is nothing to load.
    pub async fn load_settings(&self) -> Result<bool, String> {
        let path = self.paths.settings_file();
        let token = match std::fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(format!("Failed to read {:?}: {}", path, e)),
        };

        let mut s = self.session.write().await;
        s.import_settings(&token).map_err(|e| match &e {
            Error::InvalidSaveData(detail) => format!("{} in {:?} ({})", e, path, detail),
            _ => e.to_string(),
        })?;
        info!("Settings loaded from {:?}", path);
        Ok(true)
    }

    pub async fn save_settings(&self) -> Result<(), String> {
        let token = {
            let s = self.session.read().await;
            s.export_settings().map_err(|e| e.to_string())?
        };
        let path = self.paths.settings_file();
        std::fs::write(&path, token).map_err(|e| {
            let msg = format!("Failed to write settings to {:?}: {}", path, e);
            error!("{}", msg);
            msg
        })
    }

    async fn persist(&self) {
        if let Err(e) = self.save_settings().await {
            warn!("Settings not persisted: {}", e);
        }
    }

    /// Replace settings through `apply` and stop the clock if that stopped a
    /// running session.
    ///
    /// The clock lock is held throughout, in the same clock-then-session order
    /// as start and stop, so a reshape can never stop a session started by
    /// another client in between.
    async fn replace_settings<F>(&self, apply: F) -> nback::Result<()>
    where
        F: FnOnce(&mut Session) -> nback::Result<()>,
    {
        let mut clock = self.clock.lock().await;
        let stopped = {
            let mut s = self.session.write().await;
            let was_running = s.is_running();
            apply(&mut *s)?;
            was_running && !s.is_running()
        };
        if stopped {
            info!("Grid shape changed; session stopped");
            clock.stop(&self.session).await;
        }
        Ok(())
    }

    pub async fn stop(&self) {
        self.clock.lock().await.stop(&self.session).await;
    }

    pub async fn handle(&self, request: Request) -> Response {
        match request {
            Request::GetState => {
                let s = self.session.read().await;
                Response::State(Box::new(s.snapshot()))
            }
            Request::GetSettings => Response::Settings {
                settings: *self.session.read().await.settings(),
            },
            Request::SetSettings { settings } => {
                match self.replace_settings(|s| s.set_settings(settings)).await {
                    Ok(()) => {
                        warn_timing(&settings);
                        self.persist().await;
                        Response::success("Settings updated")
                    }
                    Err(e) => Response::error(e.to_string()),
                }
            }
            Request::StartSession { settings } => {
                let started = self.clock.lock().await.start(&self.session, settings).await;
                match started {
                    Ok(frame) => {
                        if let Some(s) = settings {
                            warn_timing(&s);
                            self.persist().await;
                        }
                        Response::Frame { frame }
                    }
                    Err(e) => {
                        warn!("Session start rejected: {}", e);
                        Response::error(e.to_string())
                    }
                }
            }
            Request::StopSession => {
                self.stop().await;
                Response::success("Session stopped")
            }
            Request::Respond { box_index } => {
                let verdict = self.session.write().await.respond(box_index);
                Response::Verdict {
                    message: verdict.to_string(),
                    verdict,
                }
            }
            Request::KeyPress { key } => {
                let verdict = self.session.write().await.respond_key(&key);
                Response::Verdict {
                    message: verdict.to_string(),
                    verdict,
                }
            }
            Request::ExportSettings => match self.session.read().await.export_settings() {
                Ok(token) => Response::SettingsToken { token },
                Err(e) => Response::error(e.to_string()),
            },
            Request::ImportSettings { token } => {
                match self.replace_settings(|s| s.import_settings(&token)).await {
                    Ok(()) => {
                        self.persist().await;
                        info!("Settings imported");
                        Response::success("Settings imported successfully")
                    }
                    Err(e) => {
                        if let Error::InvalidSaveData(detail) = &e {
                            warn!("Settings import rejected: {}", detail);
                        }
                        Response::error(e.to_string())
                    }
                }
            }
            Request::SetIntensity { intensity } => {
                let v = self.session.write().await.set_intensity(intensity);
                self.persist().await;
                Response::success(format!("Intensity set to {}", v))
            }
            Request::SetThemePreset { preset } => match ThemePreset::parse(&preset) {
                Some(p) => {
                    let v = self.session.write().await.apply_theme_preset(p);
                    self.persist().await;
                    Response::success(format!("Theme {} (intensity {})", p.label(), v))
                }
                None => Response::error("preset must be amoled|dark|light"),
            },
            Request::Subscribe => Response::error("Subscribe must be the first request"),
            Request::Shutdown => {
                self.stop().await;
                match self.save_settings().await {
                    Ok(()) => {
                        info!("Shutdown requested; settings saved");
                        tokio::spawn(async {
                            // Give the response a moment to flush before exiting.
                            time::sleep(Duration::from_millis(50)).await;
                            std::process::exit(0);
                        });
                        Response::success("Shutting down")
                    }
                    Err(e) => Response::error(format!("Save failed, aborting shutdown: {}", e)),
                }
            }
        }
    }
}

fn warn_timing(settings: &Settings) {
    if settings.flash_overlaps() {
        warn!(
            "flashMs ({}) is not below intervalMs ({}); stimuli will overlap",
            settings.flash_ms, settings.interval_ms
        );
    }
    if settings.interval_below_recommended() {
        warn!(
            "intervalMs ({}) is below the recommended minimum",
            settings.interval_ms
        );
    }
}
