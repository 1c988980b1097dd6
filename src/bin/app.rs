//! Webcam window that takes a selfie when you smile.
//!
//! Run with: cargo run --features app --bin auto-selfie
//!
//! Usage:
//!   auto-selfie                                # default camera, 7 s countdown
//!   auto-selfie --device 1 --interval 5        # second camera, shorter countdown
//!   auto-selfie --json > events.jsonl          # machine-readable events on stdout
//!
//! Press `q` in the window to quit.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use auto_selfie::audio::{load_clip, RodioCuePlayer};
use auto_selfie::opencv_backend::{HaarCascadeDetector, OpenCvCamera, DEFAULT_CASCADE_DIR};
use auto_selfie::rustface_backend::RustfaceDetector;
use auto_selfie::{
    CaptureConfig, CuePlayer, Error, FeatureDetector, Session, SessionConfig, SilentPlayer,
    Status,
};
use clap::Parser;
use eframe::egui;

#[derive(Parser, Debug)]
#[command(name = "auto-selfie")]
#[command(author, version, about = "Take a selfie when you smile", long_about = None)]
struct Args {
    /// Camera device index
    #[arg(short, long, default_value = "0")]
    device: i32,

    /// Seconds from countdown start to capture
    #[arg(long, default_value = "7")]
    interval: f64,

    /// Seconds before the capture at which the ready cue plays
    #[arg(long, default_value = "3")]
    warn_ahead: f64,

    /// Seconds of video shown before the first countdown starts
    #[arg(long, default_value = "1")]
    warmup: f64,

    /// Directory selfies are written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Directory holding the Haar cascade XML files
    #[arg(long, default_value = DEFAULT_CASCADE_DIR)]
    cascade_dir: PathBuf,

    /// SeetaFace model; when given, faces are found with rustface instead of
    /// the Haar face cascade
    #[arg(long)]
    face_model: Option<PathBuf>,

    /// Minimum face size for the SeetaFace detector
    #[arg(long, default_value = "20")]
    min_face_size: u32,

    /// Sound played shortly before the capture
    #[arg(long, default_value = "audio/get_ready_sound.mp3")]
    ready_sound: PathBuf,

    /// Sound played when the photo is taken
    #[arg(long, default_value = "audio/camera sound.mp3")]
    shutter_sound: PathBuf,

    /// Print events as JSON lines on stdout
    #[arg(long)]
    json: bool,

    /// Show debug output
    #[arg(short, long)]
    verbose: bool,
}

type AppSession = Session<OpenCvCamera, Box<dyn FeatureDetector>, Box<dyn CuePlayer>>;

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let capture = CaptureConfig::from_secs_f64(args.interval, args.warn_ahead)?;
    let session_config = SessionConfig::new(&args.output_dir, args.warmup)?;

    let detector = build_detector(args)?;
    let player = build_player(args);

    let camera = OpenCvCamera::open(args.device)?;
    let session = Session::new(camera, detector, player, capture, session_config, Instant::now())?;

    let failure: Rc<RefCell<Option<Error>>> = Rc::new(RefCell::new(None));
    let app_failure = Rc::clone(&failure);
    let json = args.json;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1024.0, 640.0])
            .with_resizable(true),
        ..Default::default()
    };

    eframe::run_native(
        "Camera Feed",
        options,
        Box::new(move |_cc| Ok(Box::new(SelfieApp::new(session, app_failure, json)))),
    )?;

    // The session (and with it the camera) was dropped with the app.
    take_failure(&failure).map_err(Into::into)
}

/// Error left behind by the window loop, if any.
fn take_failure(slot: &RefCell<Option<Error>>) -> Result<(), Error> {
    let failure = slot.borrow_mut().take();
    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn build_detector(args: &Args) -> Result<Box<dyn FeatureDetector>, Error> {
    let cascades = HaarCascadeDetector::from_dir(&args.cascade_dir)?;

    match args.face_model {
        Some(ref model) => {
            log::info!("using SeetaFace model {} for faces", model.display());
            let detector = RustfaceDetector::from_file(model, args.min_face_size, cascades)?;
            Ok(Box::new(detector))
        }
        None => Ok(Box::new(cascades)),
    }
}

fn build_player(args: &Args) -> Box<dyn CuePlayer> {
    let player = load_clip(&args.ready_sound)
        .and_then(|ready| Ok((ready, load_clip(&args.shutter_sound)?)))
        .and_then(|(ready, shutter)| RodioCuePlayer::new(ready, shutter));
    match player {
        Ok(player) => Box::new(player),
        Err(e) => {
            log::warn!("audio cues disabled: {}", e);
            Box::new(SilentPlayer)
        }
    }
}

struct SelfieApp {
    session: AppSession,
    failure: Rc<RefCell<Option<Error>>>,
    json: bool,

    texture: Option<egui::TextureHandle>,
    status: Option<Status>,
    faces_in_view: usize,
    smiling: bool,
    last_saved: Option<PathBuf>,
    message: String,
}

impl SelfieApp {
    fn new(session: AppSession, failure: Rc<RefCell<Option<Error>>>, json: bool) -> Self {
        let message = format!("Saving to {}", session.output_dir().display());
        Self {
            session,
            failure,
            json,
            texture: None,
            status: None,
            faces_in_view: 0,
            smiling: false,
            last_saved: None,
            message,
        }
    }

    fn step(&mut self, ctx: &egui::Context) -> Result<(), Error> {
        let tick = self.session.tick(Instant::now())?;

        if self.json {
            for event in &tick.events {
                match serde_json::to_string(event) {
                    Ok(line) => println!("{line}"),
                    Err(e) => log::warn!("cannot serialize event: {e}"),
                }
            }
        }

        if let Some(path) = tick.saved.last() {
            self.last_saved = Some(path.clone());
        }
        self.faces_in_view = tick.detections.num_faces();
        self.smiling = tick.detections.any_smiling();
        self.status = Some(tick.status);

        let (width, height) = tick.frame.dimensions();
        let image =
            egui::ColorImage::from_rgb([width as usize, height as usize], tick.frame.as_raw());
        match self.texture {
            Some(ref mut texture) => texture.set(image, egui::TextureOptions::default()),
            None => self.texture = Some(ctx.load_texture("camera", image, Default::default())),
        }
        Ok(())
    }
}

impl eframe::App for SelfieApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // A close is pending; don't touch the camera again
        if self.failure.borrow().is_some() {
            return;
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Q)) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        if let Err(e) = self.step(ctx) {
            *self.failure.borrow_mut() = Some(e);
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        egui::SidePanel::left("status").min_width(220.0).show(ctx, |ui| {
            ui.heading("Countdown");
            ui.separator();

            match self.status {
                Some(status) if status.warming_up => {
                    ui.label("Warming up...");
                }
                Some(status) => {
                    ui.label(format!("Faces in view: {}", self.faces_in_view));
                    if self.smiling {
                        ui.label("Smile detected");
                    }
                    ui.label(format_remaining(status.remaining));
                    if status.ready_announced {
                        ui.label("Get ready!");
                    }
                }
                None => {}
            }
            ui.add_space(16.0);

            ui.heading("Photos");
            ui.separator();
            let saved = self.status.map_or(0, |s| s.images_saved);
            ui.label(format!("Saved: {}", saved));
            if let Some(ref path) = self.last_saved {
                ui.label(format!("Last: {}", path.display()));
            }
            ui.add_space(16.0);

            ui.label(&self.message);
            ui.label("Press Q to quit");
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(ref texture) = self.texture {
                let available_size = ui.available_size();
                let texture_size = texture.size_vec2();

                // Scale to fit
                let scale =
                    (available_size.x / texture_size.x).min(available_size.y / texture_size.y);
                let display_size = texture_size * scale;

                ui.centered_and_justified(|ui| {
                    ui.image((texture.id(), display_size));
                });
            }
        });

        ctx.request_repaint();
    }
}

fn format_remaining(remaining: Duration) -> String {
    if remaining.is_zero() {
        "Smile!".to_string()
    } else {
        format!("Capture in {:.1}s", remaining.as_secs_f64())
    }
}
