/// mpv-backed `Player`.
///
/// mpv runs as a child process per play; pausing kills it and remembers the
/// position, playing spawns a fresh one with `--start`. Position is tracked
/// from wall-clock time since spawn, so it drifts if mpv stalls on network.
/// When mpv exits on its own the position freezes and the player reads as
/// paused.
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Mutex, MutexGuard};

use media_proto::platform;
use media_proto::protocol::PlayerBackend;
use media_proto::session::{Player, PlayerFactory, PlayerOptions};
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub struct MpvPlayer {
    binary: PathBuf,
    options: PlayerOptions,
    src: Option<String>,
    muted: bool,
    size: Option<(u32, u32)>,
    run: Mutex<Run>,
}

#[derive(Default)]
struct Run {
    /// Seconds into the media at `started_at` (or while stopped).
    position: f64,
    started_at: Option<Instant>,
    process: Option<Child>,
}

impl Run {
    fn current_time(&self) -> f64 {
        match self.started_at {
            Some(at) => self.position + at.elapsed().as_secs_f64(),
            None => self.position,
        }
    }

    /// Drop a child that has already exited.
    fn reap(&mut self) {
        let Some(child) = self.process.as_mut() else {
            return;
        };
        match child.try_wait() {
            Ok(None) => {}
            Ok(Some(status)) => {
                info!("mpv: exited ({}) at {:.1}s", status, self.current_time());
                self.freeze();
            }
            Err(e) => {
                warn!("mpv: wait failed: {}", e);
                self.freeze();
            }
        }
    }

    fn freeze(&mut self) {
        self.position = self.current_time();
        self.started_at = None;
        self.process = None;
    }
}

impl MpvPlayer {
    pub fn new(binary: PathBuf, options: PlayerOptions) -> Self {
        Self {
            binary,
            options,
            src: None,
            muted: false,
            size: None,
            run: Mutex::new(Run::default()),
        }
    }

    fn run(&self) -> MutexGuard<'_, Run> {
        let mut run = self.run.lock().unwrap_or_else(|e| e.into_inner());
        run.reap();
        run
    }

    fn args(&self, src: &str, start: f64) -> Vec<String> {
        let mut args = vec![
            "--really-quiet".to_string(),
            "--force-window=yes".to_string(),
            format!("--start={:.3}", start),
            format!("--mute={}", if self.muted { "yes" } else { "no" }),
        ];
        args.push(if self.options.webgl {
            "--hwdec=auto".to_string()
        } else {
            "--hwdec=no".to_string()
        });
        if self.options.skip_audio {
            args.push("--aid=no".to_string());
        }
        if let Some(limit) = self.options.memory_limit {
            args.push(format!("--demuxer-max-bytes={}", limit));
        }
        let geometry = self
            .size
            .or(self.options.width_hint.zip(self.options.height_hint));
        if let Some((w, h)) = geometry {
            args.push(format!("--geometry={}x{}", w, h));
        }
        args.push(src.to_string());
        args
    }

    fn kill(&mut self) {
        let mut run = self.run();
        if let Some(mut child) = run.process.take() {
            if let Err(e) = child.start_kill() {
                warn!("mpv: kill failed: {}", e);
            }
        }
        run.started_at = None;
    }
}

impl Player for MpvPlayer {
    fn set_src(&mut self, url: &str) {
        self.src = Some(url.to_string());
    }

    fn set_muted(&mut self, muted: bool) {
        // Applied on the next spawn; a running mpv keeps its audio state.
        self.muted = muted;
    }

    fn set_current_time(&mut self, seconds: f64) {
        let mut run = self.run();
        run.position = seconds;
        if run.process.is_some() {
            run.started_at = Some(Instant::now());
        }
    }

    fn set_poster(&mut self, url: &str) {
        debug!("mpv: poster {} (not shown)", url);
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.size = Some((width, height));
    }

    fn load(&mut self) -> anyhow::Result<()> {
        anyhow::ensure!(self.src.is_some(), "no source set");
        Ok(())
    }

    fn play(&mut self) -> anyhow::Result<()> {
        let src = self
            .src
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("no source set"))?;
        let mut run = self.run();
        if run.process.is_some() {
            return Ok(());
        }

        let child = Command::new(&self.binary)
            .args(self.args(src, run.position))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        info!("mpv: spawned pid {:?} at {:.1}s", child.id(), run.position);

        run.process = Some(child);
        run.started_at = Some(Instant::now());
        Ok(())
    }

    fn pause(&mut self) -> anyhow::Result<()> {
        {
            let mut run = self.run();
            run.position = run.current_time();
        }
        self.kill();
        Ok(())
    }

    fn detach(&mut self) {
        self.kill();
    }

    fn current_time(&self) -> f64 {
        self.run().current_time()
    }

    fn is_paused(&self) -> bool {
        self.run().process.is_none()
    }
}

/// Creates `MpvPlayer`s; every backend maps onto mpv with different flags.
pub struct MpvFactory;

impl PlayerFactory for MpvFactory {
    fn create(
        &mut self,
        backend: PlayerBackend,
        options: &PlayerOptions,
    ) -> anyhow::Result<Box<dyn Player>> {
        let binary = platform::find_mpv_binary()
            .ok_or_else(|| anyhow::anyhow!("mpv not found on PATH (set MPV_PATH)"))?;
        debug!("mpv: creating player for backend {} ({:?})", backend, options);
        Ok(Box::new(MpvPlayer::new(binary, options.clone())))
    }
}
