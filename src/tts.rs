//! Asynchronous speech engine backed by a dedicated audio worker thread.
//!
//! The controller hands over one sentence at a time. The worker synthesizes
//! it with the configured [`Voice`], then either plays it through `rodio` or
//! writes it into an export directory, and finally posts a completion or
//! failure event through the notifier. Cancellation and suspension are
//! shared flags the worker polls while a sentence is playing.

use crate::voice::{Voice, VoiceFactory};
use anyhow::{Context, Result};
use readaloud_core::cancellation::CancellationToken;
use readaloud_core::wav::write_wav_file;
use readaloud_core::{EventNotifier, SpeechEngine, SpeechError, SpeechEvent, SpeechRequest};
use rodio::source::Zero;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(15);

/// Where synthesized sentences go.
#[derive(Debug, Clone)]
pub enum OutputTarget {
    Speakers { volume: f32, pause_after: Duration },
    Directory(PathBuf),
}

impl OutputTarget {
    fn can_suspend(&self) -> bool {
        matches!(self, OutputTarget::Speakers { .. })
    }
}

struct Job {
    request: SpeechRequest,
    cancel: CancellationToken,
    paused: Arc<AtomicBool>,
}

enum WorkerMessage {
    Speak(Job),
    Shutdown,
}

struct ActiveJob {
    cancel: CancellationToken,
    paused: Arc<AtomicBool>,
}

enum JobOutcome {
    Finished,
    Cancelled,
}

pub struct AudioSpeechEngine {
    jobs: mpsc::Sender<WorkerMessage>,
    active: Option<ActiveJob>,
    can_suspend: bool,
    worker: Option<JoinHandle<()>>,
}

impl AudioSpeechEngine {
    pub fn spawn(factory: VoiceFactory, target: OutputTarget, notifier: EventNotifier) -> Result<Self> {
        let (jobs, rx) = mpsc::channel();
        let can_suspend = target.can_suspend();
        let worker = thread::Builder::new()
            .name("readaloud-audio".to_string())
            .spawn(move || run_worker(factory, target, rx, notifier))
            .context("Spawning audio worker thread")?;
        Ok(Self {
            jobs,
            active: None,
            can_suspend,
            worker: Some(worker),
        })
    }
}

impl SpeechEngine for AudioSpeechEngine {
    fn speak(&mut self, request: SpeechRequest) -> Result<(), SpeechError> {
        self.cancel_all();
        let cancel = CancellationToken::new();
        let paused = Arc::new(AtomicBool::new(false));
        let job = Job {
            request,
            cancel: cancel.clone(),
            paused: Arc::clone(&paused),
        };
        self.jobs
            .send(WorkerMessage::Speak(job))
            .map_err(|_| SpeechError::Unavailable("audio worker has stopped".to_string()))?;
        self.active = Some(ActiveJob { cancel, paused });
        Ok(())
    }

    fn cancel_all(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
        }
    }

    fn suspend(&mut self) -> bool {
        match &self.active {
            Some(active) if self.can_suspend => {
                active.paused.store(true, Ordering::Release);
                true
            }
            _ => false,
        }
    }

    fn resume(&mut self) {
        if let Some(active) = &self.active {
            active.paused.store(false, Ordering::Release);
        }
    }
}

impl Drop for AudioSpeechEngine {
    fn drop(&mut self) {
        self.cancel_all();
        let _ = self.jobs.send(WorkerMessage::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Audio worker panicked during shutdown");
            }
        }
    }
}

/// Lazily built voice; a construction failure is remembered and reported
/// for every later sentence.
enum VoiceSlot {
    Pending(VoiceFactory),
    Ready(Box<dyn Voice>),
    Failed(String),
}

impl VoiceSlot {
    fn get(&mut self) -> Result<&mut Box<dyn Voice>, SpeechError> {
        if let VoiceSlot::Pending(_) = self {
            let slot = std::mem::replace(self, VoiceSlot::Failed(String::new()));
            if let VoiceSlot::Pending(factory) = slot {
                *self = match factory() {
                    Ok(voice) => {
                        info!(voice = voice.name(), "Voice ready");
                        VoiceSlot::Ready(voice)
                    }
                    Err(err) => {
                        warn!("Failed to load voice: {err:#}");
                        VoiceSlot::Failed(format!("{err:#}"))
                    }
                };
            }
        }
        match self {
            VoiceSlot::Ready(voice) => Ok(voice),
            VoiceSlot::Failed(message) => Err(SpeechError::Unavailable(message.clone())),
            VoiceSlot::Pending(_) => Err(SpeechError::Unavailable("voice not loaded".to_string())),
        }
    }
}

fn run_worker(
    factory: VoiceFactory,
    target: OutputTarget,
    jobs: mpsc::Receiver<WorkerMessage>,
    notifier: EventNotifier,
) {
    let mut voice = VoiceSlot::Pending(factory);
    // OutputStream is not Send, so it is opened on this thread and kept here.
    let output = match &target {
        OutputTarget::Speakers { .. } => match OutputStream::try_default() {
            Ok(pair) => Some(pair),
            Err(err) => {
                warn!("Opening audio output failed: {err}");
                None
            }
        },
        OutputTarget::Directory(dir) => {
            info!(dir = %dir.display(), "Exporting sentences as WAV files");
            None
        }
    };
    let handle = output.as_ref().map(|(_stream, handle)| handle);

    for message in jobs {
        let job = match message {
            WorkerMessage::Speak(job) => job,
            WorkerMessage::Shutdown => break,
        };
        let ticket = job.request.ticket;
        match run_job(&job, &mut voice, &target, handle) {
            Ok(JobOutcome::Finished) => notifier(SpeechEvent::completed(ticket)),
            Ok(JobOutcome::Cancelled) => {
                debug!(ticket = ?ticket, "Sentence cancelled; no event posted");
            }
            Err(err) => notifier(SpeechEvent::failed(ticket, err.to_string())),
        }
    }
    debug!("Audio worker exiting");
}

fn run_job(
    job: &Job,
    voice: &mut VoiceSlot,
    target: &OutputTarget,
    handle: Option<&OutputStreamHandle>,
) -> Result<JobOutcome, SpeechError> {
    let request = &job.request;
    if job.cancel.is_cancelled() {
        return Ok(JobOutcome::Cancelled);
    }
    let voice = voice.get()?;
    let wav = match voice.synthesize(&request.text, request.rate, &job.cancel) {
        Ok(wav) => wav,
        Err(_) if job.cancel.is_cancelled() => return Ok(JobOutcome::Cancelled),
        Err(err) => return Err(SpeechError::Synthesis(format!("{err:#}"))),
    };
    if job.cancel.is_cancelled() {
        return Ok(JobOutcome::Cancelled);
    }

    match target {
        OutputTarget::Speakers {
            volume,
            pause_after,
        } => {
            let handle = handle
                .ok_or_else(|| SpeechError::Output("no audio output device".to_string()))?;
            play_wav(wav, handle, *volume, *pause_after, job)
        }
        OutputTarget::Directory(dir) => {
            let path = dir.join(format!(
                "unit-{:03}-{:04}.wav",
                request.ticket.generation,
                request.ticket.ordinal + 1
            ));
            write_wav_file(&path, &wav).map_err(|err| SpeechError::Output(format!("{err:#}")))?;
            info!(path = %path.display(), "Exported sentence audio");
            Ok(JobOutcome::Finished)
        }
    }
}

fn play_wav(
    wav: Vec<u8>,
    handle: &OutputStreamHandle,
    volume: f32,
    pause_after: Duration,
    job: &Job,
) -> Result<JobOutcome, SpeechError> {
    let sink = Sink::try_new(handle).map_err(|err| SpeechError::Output(err.to_string()))?;
    queue_sentence(
        &sink,
        wav,
        volume,
        pause_after,
        job.paused.load(Ordering::Acquire),
    )?;
    debug!(
        ordinal = job.request.ticket.ordinal,
        pause_ms = pause_after.as_millis(),
        "Playing sentence"
    );

    loop {
        if job.cancel.is_cancelled() {
            sink.stop();
            return Ok(JobOutcome::Cancelled);
        }
        let paused = job.paused.load(Ordering::Acquire);
        if paused && !sink.is_paused() {
            sink.pause();
        } else if !paused && sink.is_paused() {
            sink.play();
        }
        if sink.empty() {
            return Ok(JobOutcome::Finished);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Queue one sentence and its trailing silence. A sink whose job was
/// suspended during synthesis is paused before any sample reaches it.
fn queue_sentence(
    sink: &Sink,
    wav: Vec<u8>,
    volume: f32,
    pause_after: Duration,
    paused: bool,
) -> Result<(), SpeechError> {
    let source =
        Decoder::new(Cursor::new(wav)).map_err(|err| SpeechError::Output(err.to_string()))?;
    sink.set_volume(volume);
    if paused {
        sink.pause();
    }
    sink.append(source);
    if pause_after > Duration::ZERO {
        let silence = Zero::<f32>::new(1, 48_000).take_duration(pause_after);
        sink.append(silence);
    }
    Ok(())
}
