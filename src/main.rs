//! Video feedback wizard: prompt, upload, and AI feedback in three steps

use std::{borrow::Cow, path::PathBuf, sync::Arc, time::Duration};

use video_feedback_wizard::{
    client::{AnalysisClient, HttpAnalysisClient, SimulatedAnalysisClient},
    config::{AppConfig, Backend},
    model::{FileHandle, Step, WizardState},
    run::{self, RunMessage},
    validation,
    wizard::{Effect, Event, RunRequest, Wizard},
};

// eframe/egui for GUI application framework
use eframe::{App, Frame, egui};
use egui::{Color32, RichText, Visuals};
// OnceCell for single-time runtime initialization
use once_cell::sync::OnceCell;
// FileDialog for picking the video
use rfd::FileDialog;
use tokio::{
    runtime::Runtime,
    sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
};
use tracing_subscriber::EnvFilter;

// Global Tokio runtime stored in a OnceCell for lazy init
static RUNTIME: OnceCell<Arc<Runtime>> = OnceCell::new();

/// Prompts longer than this are collapsed on the result screen
const PROMPT_PREVIEW_CHARS: usize = 100;

/// Program entry point: initializes logging, config and runtime, then launches GUI
fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Falling back to default config");
        AppConfig::default()
    });

    let rt = Arc::new(Runtime::new()?);
    if RUNTIME.set(Arc::clone(&rt)).is_err() {
        return Err("runtime already initialized".into());
    }

    let client: Arc<dyn AnalysisClient> = match config.backend {
        Backend::Http => {
            let http = Arc::new(HttpAnalysisClient::new(
                config.endpoint.clone(),
                config.request_timeout(),
            )?);
            // Startup probe only logs; the wizard works (and reports errors) either way
            let probe = Arc::clone(&http);
            rt.spawn(async move {
                match probe.health().await {
                    Ok(()) => tracing::info!(url = probe.base_url(), "Analysis service is up"),
                    Err(e) => tracing::warn!(url = probe.base_url(), error = %e, "Analysis service unreachable"),
                }
            });
            http
        }
        Backend::Simulated => {
            tracing::info!("Using simulated analysis backend");
            Arc::new(SimulatedAnalysisClient::default())
        }
    };

    // Configure native options for the egui window
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([720.0, 640.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Video Feedback",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(Visuals::dark());
            Box::new(WizardApp::new(config, client))
        }),
    )?;
    Ok(())
}

/// Application state for the GUI
struct WizardApp {
    /// Flow state; only mutated through `dispatch`
    wizard: Wizard,
    /// Text currently typed into the prompt box
    prompt_input: String,
    /// Whether the long prompt is expanded on the result screen
    show_full_prompt: bool,
    /// File that could not be read from disk (not a validation failure)
    pick_error: Option<String>,
    /// Settings used for every run
    config: AppConfig,
    /// Backend that performs the analysis
    client: Arc<dyn AnalysisClient>,
    /// Handed to each spawned run
    run_tx: UnboundedSender<RunMessage>,
    /// Progress and completion messages from runs
    run_rx: UnboundedReceiver<RunMessage>,
}

/// What the user did this frame
enum Intent {
    Dispatch(Event),
    Browse,
}

impl WizardApp {
    fn new(config: AppConfig, client: Arc<dyn AnalysisClient>) -> Self {
        let (run_tx, run_rx) = unbounded_channel();
        Self {
            wizard: Wizard::new(),
            prompt_input: String::new(),
            show_full_prompt: false,
            pick_error: None,
            config,
            client,
            run_tx,
            run_rx,
        }
    }

    fn dispatch(&mut self, event: Event) {
        let is_reset = matches!(event, Event::Reset);
        if let Effect::StartRun(request) = self.wizard.dispatch(event) {
            self.show_full_prompt = false;
            self.spawn_run(request);
        }
        if is_reset {
            self.prompt_input.clear();
            self.show_full_prompt = false;
            self.pick_error = None;
        }
    }

    fn spawn_run(&self, request: RunRequest) {
        let Some(rt) = RUNTIME.get() else {
            tracing::error!("Runtime not initialized, cannot start analysis");
            return;
        };
        rt.spawn(run::execute(
            Arc::clone(&self.client),
            self.config.estimator(),
            request,
            self.run_tx.clone(),
        ));
    }

    fn select_path(&mut self, path: PathBuf) {
        match FileHandle::from_path(&path) {
            Ok(file) => {
                self.pick_error = None;
                self.dispatch(Event::SelectFile(file));
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not open selected file");
                self.pick_error = Some(format!("Could not open {}: {}", path.display(), e));
            }
        }
    }

    fn browse(&mut self) {
        if let Some(path) = FileDialog::new()
            .add_filter("Video", validation::accepted_extensions())
            .pick_file()
        {
            self.select_path(path);
        }
    }
}

/// GUI update loop: called each frame to redraw and handle interactions
impl App for WizardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        // Apply everything the running analysis reported since last frame
        while let Ok(msg) = self.run_rx.try_recv() {
            self.dispatch(msg.into_event());
        }

        // Files dropped onto the window count as a selection on the upload step
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        if self.wizard.state().step == Step::Upload {
            if let Some(path) = dropped.into_iter().find_map(|f| f.path) {
                self.select_path(path);
            }
        }

        let mut intents = Vec::new();
        egui::CentralPanel::default().show(ctx, |ui| {
            let state = self.wizard.state();
            step_header(ui, state);
            ui.add_space(12.0);
            match state.step {
                Step::Prompt => prompt_step(ui, state, &mut self.prompt_input, &mut intents),
                Step::Upload => upload_step(ui, state, self.pick_error.as_deref(), &mut intents),
                Step::Result => result_step(ui, state, &mut self.show_full_prompt, &mut intents),
            }
        });

        for intent in intents {
            match intent {
                Intent::Dispatch(event) => self.dispatch(event),
                Intent::Browse => self.browse(),
            }
        }

        // Request periodic repaint for progress updates
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

fn step_header(ui: &mut egui::Ui, state: &WizardState) {
    let title = if state.step == Step::Result && state.is_processing {
        "Processing your video"
    } else {
        state.step.title()
    };
    ui.heading(format!("{}. {}", state.step.number(), title));
}

fn inline_error(ui: &mut egui::Ui, error: Option<&str>) {
    if let Some(error) = error {
        ui.colored_label(Color32::LIGHT_RED, error);
    }
}

fn prompt_step(ui: &mut egui::Ui, state: &WizardState, input: &mut String, intents: &mut Vec<Intent>) {
    ui.label("Describe what aspects of the video you want feedback on");
    ui.add(
        egui::TextEdit::multiline(input)
            .desired_rows(5)
            .desired_width(f32::INFINITY)
            .hint_text("E.g., Analyze this video for storytelling effectiveness, visual pacing, and audience engagement potential..."),
    );
    inline_error(ui, state.error.as_deref());

    ui.add_space(8.0);
    if ui.button("Continue").clicked() {
        intents.push(Intent::Dispatch(Event::SubmitPrompt(input.clone())));
    }
}

fn upload_step(ui: &mut egui::Ui, state: &WizardState, pick_error: Option<&str>, intents: &mut Vec<Intent>) {
    ui.label(RichText::new("Analysis prompt:").strong());
    ui.group(|ui| {
        ui.label(&state.prompt);
    });

    ui.add_space(8.0);
    ui.group(|ui| {
        ui.set_width(ui.available_width());
        match &state.video_file {
            Some(file) => {
                ui.label(RichText::new(format!("✔ {}", file.name)).color(Color32::LIGHT_GREEN));
                ui.label(validation::format_size(file.size_bytes));
            }
            None => {
                ui.label("Drag and drop your video here");
                ui.label("or browse for a file");
            }
        }
        if ui.button("Browse…").clicked() {
            intents.push(Intent::Browse);
        }
        ui.small(format!(
            "Supported formats: MP4, MOV, WebM (Max size: {})",
            validation::format_size(validation::MAX_FILE_SIZE)
        ));
    });
    inline_error(ui, upload_error(state, pick_error));

    ui.add_space(8.0);
    ui.horizontal(|ui| {
        if ui.button("Back").clicked() {
            intents.push(Intent::Dispatch(Event::Back));
        }
        let ready = state.video_file.is_some();
        if ui.add_enabled(ready, egui::Button::new("Analyze Video")).clicked() {
            intents.push(Intent::Dispatch(Event::Submit));
        }
    });
}

fn result_step(ui: &mut egui::Ui, state: &WizardState, show_full_prompt: &mut bool, intents: &mut Vec<Intent>) {
    ui.label(RichText::new("Analysis prompt:").strong());
    ui.horizontal_wrapped(|ui| {
        ui.label(&*display_prompt(&state.prompt, *show_full_prompt));
        if state.prompt.chars().count() > PROMPT_PREVIEW_CHARS {
            let toggle = if *show_full_prompt { "Show less" } else { "Show more" };
            if ui.link(toggle).clicked() {
                *show_full_prompt = !*show_full_prompt;
            }
        }
    });

    if let Some(file) = &state.video_file {
        ui.label(format!(
            "Video: {} ({})",
            file.name,
            validation::format_size(file.size_bytes)
        ));
    }
    ui.add_space(12.0);

    if state.is_processing {
        ui.add(
            egui::ProgressBar::new(state.progress / 100.0)
                .text(format!("{}%", state.progress.round() as u32)),
        );
        ui.label("Analyzing your video. This may take a minute...");
    } else if let Some(result) = &state.result {
        egui::ScrollArea::vertical()
            .auto_shrink([false; 2])
            .max_height((ui.available_height() - 48.0).max(120.0))
            .show(ui, |ui| {
                let text = if result.starts_with("Error: ") {
                    RichText::new(result).color(Color32::LIGHT_RED)
                } else {
                    RichText::new(result)
                };
                ui.label(text);
            });
    }

    ui.add_space(8.0);
    ui.horizontal(|ui| {
        if ui.button("Back").clicked() {
            intents.push(Intent::Dispatch(Event::Back));
        }
        if ui.button("Start over").clicked() {
            intents.push(Intent::Dispatch(Event::Reset));
        }
    });
}

/// A failed read is always newer than the last validation verdict
fn upload_error<'a>(state: &'a WizardState, pick_error: Option<&'a str>) -> Option<&'a str> {
    pick_error.or(state.error.as_deref())
}

/// Collapses prompts longer than [`PROMPT_PREVIEW_CHARS`] unless expanded
fn display_prompt(prompt: &str, expanded: bool) -> Cow<'_, str> {
    if expanded || prompt.chars().count() <= PROMPT_PREVIEW_CHARS {
        Cow::Borrowed(prompt)
    } else {
        let head: String = prompt.chars().take(PROMPT_PREVIEW_CHARS).collect();
        Cow::Owned(format!("{head}..."))
    }
}
