use std::path::PathBuf;

use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use bhojan_core::{
    run_turn, ChatCompletionsClient, Config, Conversation, HistoryStore, Provider,
    TesseractOcr, TurnOutcome,
};

/// Rotating status lines shown while a turn is in flight
pub const LOADING_STEPS: [&str; 4] = [
    "Scanning ingredients",
    "Consulting nutrition context",
    "Analyzing conflicts & trade-offs",
    "Synthesizing final insights",
];

/// Ticks spent on each loading step (4 x 300ms)
const TICKS_PER_STEP: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Chat,
    History,
    Input,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,
    pub status: Option<String>,

    // Conversation
    pub conversation: Conversation,
    pub input: String,
    pub input_cursor: usize, // cursor position in input, in chars
    pub attached_image: Option<PathBuf>,
    pub turn_task: Option<JoinHandle<TurnOutcome>>,
    pub loading: bool,

    // Chat viewport
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub follow_chat: bool,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
    pub loading_step: usize,
    step_ticks: u8,

    // History sidebar
    pub history: HistoryStore,
    pub show_history: bool,
    pub history_state: ListState,

    // Image attachment popup
    pub show_attach_input: bool,
    pub attach_input: String,
    pub attach_cursor: usize,

    // Provider state
    pub config: Config,
    pub config_path: Option<PathBuf>, // None saves to the default location
    pub client: ChatCompletionsClient,
    model_override: Option<(Provider, String)>,
    pub ocr: TesseractOcr,
    pub show_provider_picker: bool,
    pub provider_picker_state: ListState,

    // API key input state
    pub show_api_key_input: bool,
    pub api_key_input: String,
    pub api_key_input_cursor: usize,
    pub api_key_target_provider: Option<Provider>,

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub history_area: Option<Rect>,
}

impl App {
    pub fn new(config: Config, client: ChatCompletionsClient, history: HistoryStore) -> Self {
        let mut history_state = ListState::default();
        if !history.is_empty() {
            history_state.select(Some(0));
        }

        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::Input,
            status: None,

            conversation: Conversation::new(),
            input: String::new(),
            input_cursor: 0,
            attached_image: None,
            turn_task: None,
            loading: false,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            follow_chat: true,

            animation_frame: 0,
            loading_step: 0,
            step_ticks: 0,

            history,
            show_history: false,
            history_state,

            show_attach_input: false,
            attach_input: String::new(),
            attach_cursor: 0,

            config,
            config_path: None,
            client,
            model_override: None,
            ocr: TesseractOcr::default(),
            show_provider_picker: false,
            provider_picker_state: ListState::default(),

            show_api_key_input: false,
            api_key_input: String::new(),
            api_key_input_cursor: 0,
            api_key_target_provider: None,

            chat_area: None,
            history_area: None,
        }
    }

    /// Pin `model` for the current provider, surviving provider switches
    pub fn with_model_override(mut self, model: &str) -> Self {
        self.model_override = Some((self.client.provider(), model.to_string()));
        self.client = self.client.clone().with_model(model);
        self
    }

    /// Submit the current input (and attachment) as a new turn.
    ///
    /// Ignored while a turn is already running, and when there is neither
    /// text nor an image.
    pub fn send_input(&mut self) {
        if self.turn_task.is_some() {
            self.status = Some("Still analyzing the previous input".to_string());
            return;
        }

        let image = self.attached_image.clone();
        let Some(turn) = self.conversation.submit(&self.input, image) else {
            return;
        };

        info!(has_image = turn.image.is_some(), "submitting turn");

        self.input.clear();
        self.input_cursor = 0;
        self.attached_image = None;
        self.status = None;
        self.loading = true;
        self.loading_step = 0;
        self.step_ticks = 0;
        self.follow_chat = true;

        let client = self.client.clone();
        let ocr = self.ocr.clone();
        self.turn_task = Some(tokio::spawn(async move {
            run_turn(&ocr, &client, turn).await
        }));
    }

    /// Collect a finished turn, if any, and record it in history
    pub async fn poll_turn(&mut self) {
        let finished = self.turn_task.as_ref().map(|t| t.is_finished()).unwrap_or(false);
        if !finished {
            return;
        }
        let Some(task) = self.turn_task.take() else {
            return;
        };

        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("analysis task did not complete: {}", e);
                TurnOutcome::fallback()
            }
        };
        self.finish_turn(outcome);
    }

    pub fn finish_turn(&mut self, outcome: TurnOutcome) {
        self.loading = false;
        self.follow_chat = true;

        if let Some(item) = self.conversation.complete(outcome) {
            if let Err(e) = self.history.push(item) {
                warn!("could not save history: {:#}", e);
                self.status = Some("Could not save history".to_string());
            }
            self.history_state.select(Some(0));
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.loading {
            self.animation_frame = (self.animation_frame + 1) % 3;
            self.step_ticks += 1;
            if self.step_ticks >= TICKS_PER_STEP {
                self.step_ticks = 0;
                self.loading_step = (self.loading_step + 1) % LOADING_STEPS.len();
            }
        }
    }

    pub fn loading_text(&self) -> String {
        let dots = ".".repeat((self.animation_frame as usize) + 1);
        format!("{}{}", LOADING_STEPS[self.loading_step], dots)
    }

    // Chat scrolling
    pub fn scroll_chat_down(&mut self, lines: u16) {
        self.follow_chat = false;
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.follow_chat = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_chat_top(&mut self) {
        self.follow_chat = false;
        self.chat_scroll = 0;
    }

    pub fn scroll_chat_bottom(&mut self) {
        self.follow_chat = true;
    }

    // History sidebar
    pub fn toggle_history(&mut self) {
        self.show_history = !self.show_history;
        if self.show_history {
            if self.history_state.selected().is_none() && !self.history.is_empty() {
                self.history_state.select(Some(0));
            }
        } else if self.focus == FocusPane::History {
            self.focus = FocusPane::Chat;
        }
    }

    pub fn history_nav_down(&mut self) {
        let len = self.history.len();
        if len > 0 {
            let i = self.history_state.selected().unwrap_or(0);
            self.history_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn history_nav_up(&mut self) {
        let i = self.history_state.selected().unwrap_or(0);
        self.history_state.select(Some(i.saturating_sub(1)));
    }

    /// Show the selected history entry's messages in the chat pane
    pub fn load_selected_history(&mut self) {
        if self.turn_task.is_some() {
            self.status = Some("Wait for the current analysis to finish".to_string());
            return;
        }
        let Some(item) = self.history_state.selected().and_then(|i| self.history.get(i)) else {
            return;
        };
        self.conversation.restore(item);
        self.chat_scroll = 0;
        self.follow_chat = false;
        self.focus = FocusPane::Chat;
    }

    pub fn clear_history(&mut self) {
        match self.history.clear() {
            Ok(()) => self.status = Some("History cleared".to_string()),
            Err(e) => {
                warn!("could not clear history: {:#}", e);
                self.status = Some("Could not clear history".to_string());
            }
        }
        self.history_state.select(None);
    }

    pub fn new_conversation(&mut self) {
        if self.turn_task.is_some() {
            return;
        }
        self.conversation.clear();
        self.chat_scroll = 0;
        self.follow_chat = true;
        self.status = None;
    }

    // Image attachment
    pub fn open_attach_input(&mut self) {
        self.attach_input = self
            .attached_image
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        self.attach_cursor = self.attach_input.chars().count();
        self.show_attach_input = true;
    }

    /// Accept the typed path; an empty path removes the attachment
    pub fn confirm_attach_input(&mut self) {
        let raw = self.attach_input.trim();
        if raw.is_empty() {
            self.attached_image = None;
        } else {
            let path = expand_home(raw);
            if path.is_file() {
                self.status = None;
            } else {
                self.status = Some(format!("No file at {}", path.display()));
            }
            self.attached_image = Some(path);
        }
        self.show_attach_input = false;
        self.attach_input.clear();
        self.attach_cursor = 0;
    }

    pub fn remove_attachment(&mut self) {
        self.attached_image = None;
    }

    // Provider picker methods
    pub fn open_provider_picker(&mut self) {
        let current_idx = Provider::all()
            .iter()
            .position(|p| *p == self.client.provider())
            .unwrap_or(0);
        self.provider_picker_state.select(Some(current_idx));
        self.show_provider_picker = true;
    }

    pub fn provider_picker_nav_down(&mut self) {
        let len = Provider::all().len();
        let i = self.provider_picker_state.selected().unwrap_or(0);
        self.provider_picker_state.select(Some((i + 1).min(len - 1)));
    }

    pub fn provider_picker_nav_up(&mut self) {
        let i = self.provider_picker_state.selected().unwrap_or(0);
        self.provider_picker_state.select(Some(i.saturating_sub(1)));
    }

    /// Switch to the highlighted provider, or ask for its key first
    pub fn pick_provider(&mut self) {
        let Some(provider) = self
            .provider_picker_state
            .selected()
            .and_then(|i| Provider::all().get(i).copied())
        else {
            return;
        };

        self.show_provider_picker = false;
        if self.config.key_source(provider).is_none() {
            self.api_key_target_provider = Some(provider);
            self.api_key_input.clear();
            self.api_key_input_cursor = 0;
            self.show_api_key_input = true;
        } else {
            self.switch_provider(provider);
        }
    }

    pub fn confirm_api_key(&mut self) {
        if let Some(provider) = self.api_key_target_provider.take() {
            let key = self.api_key_input.trim().to_string();
            if !key.is_empty() {
                self.config.set_api_key(provider, &key);
                self.switch_provider(provider);
            }
        }
        self.show_api_key_input = false;
        self.api_key_input.clear();
        self.api_key_input_cursor = 0;
    }

    pub fn cancel_api_key(&mut self) {
        self.show_api_key_input = false;
        self.api_key_input.clear();
        self.api_key_input_cursor = 0;
        self.api_key_target_provider = None;
    }

    fn switch_provider(&mut self, provider: Provider) {
        // A stored model/base URL belongs to the previous provider
        if provider != self.config.provider() {
            self.config.model = None;
            self.config.base_url = None;
        }
        self.config.provider = Some(provider.as_str().to_string());
        let saved = match &self.config_path {
            Some(path) => self.config.save_to(path),
            None => self.config.save(),
        };
        if let Err(e) = saved {
            warn!("could not save config: {:#}", e);
        }

        let mut client = ChatCompletionsClient::from_config(&self.config, provider);
        if let Some((owner, model)) = &self.model_override {
            if *owner == provider {
                client = client.with_model(model);
            }
        }
        self.client = client;
        info!(provider = provider.as_str(), model = self.client.model(), "switched provider");
    }
}

fn expand_home(raw: &str) -> PathBuf {
    match raw.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(raw)),
        None => PathBuf::from(raw),
    }
}
