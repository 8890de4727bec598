use crate::{
    api_client::{
        GameApi,
        HttpGameApi,
    },
    config::AppConfig,
    cues::{
        CuePlayer,
        Silent,
        TerminalBell,
    },
    dispatch,
    game::GameMode,
    router::route,
    session::{
        Completion,
        Dispatch,
        Rejected,
        SessionController,
    },
    ui::{
        self,
        InputMode,
        UserEvent,
    },
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use std::{
    path::Path,
    sync::Arc,
};
use tokio::sync::mpsc;
use tracing::{
    debug,
    info,
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "yahtzee-client.log";

/// Logs go to a daily rolling file under `log_dir` so they never draw over
/// the terminal UI. Keep the guard alive until exit or buffered lines are
/// lost.
pub fn init_tracing(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .wrap_err_with(|| format!("creating log directory {}", log_dir.display()))?;
    let (writer, guard) =
        tracing_appender::non_blocking(rolling::daily(log_dir, LOG_FILE_PREFIX));
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| eyre!(e))?;
    Ok(guard)
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Connects key presses and finished requests to the session. Every
/// accepted action is performed on its own task and reports back through
/// the completion channel.
pub struct AppController<A> {
    session: SessionController,
    api: A,
    cues: Arc<dyn CuePlayer>,
    config: AppConfig,
    done: mpsc::UnboundedSender<Completion>,
}

impl<A> AppController<A>
where
    A: GameApi + Clone + Send + Sync + 'static,
{
    pub fn new(
        api: A,
        cues: Arc<dyn CuePlayer>,
        config: AppConfig,
        done: mpsc::UnboundedSender<Completion>,
    ) -> Self {
        Self {
            session: SessionController::new(config.timings),
            api,
            cues,
            config,
            done,
        }
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    pub fn input_mode(&self) -> InputMode {
        InputMode::of(&route(&self.session), self.session.notice())
    }

    fn launch(&self, job: Dispatch) {
        dispatch::spawn(
            self.api.clone(),
            Arc::clone(&self.cues),
            job,
            self.done.clone(),
        );
    }

    fn launch_or_log(&self, action: &str, result: Result<Dispatch, Rejected>) {
        match result {
            Ok(job) => self.launch(job),
            Err(reason) => debug!(%reason, action, "action rejected"),
        }
    }

    fn start(&mut self, mode: GameMode) {
        let players = self.config.player_names(mode);
        let result = self.session.start_game(mode, players);
        self.launch_or_log("start game", result);
    }

    pub fn handle_event(&mut self, event: UserEvent) -> Flow {
        match event {
            UserEvent::Quit => return Flow::Quit,
            UserEvent::StartGame(mode) => self.start(mode),
            UserEvent::ShowHighScores => {
                let result = self.session.show_high_scores();
                self.launch_or_log("show high scores", result);
            }
            UserEvent::ToggleDie(index) => {
                if !self.session.toggle_die(index) {
                    debug!(index, "toggle ignored");
                }
            }
            UserEvent::Roll => {
                let result = self.session.request_roll();
                self.launch_or_log("roll", result);
            }
            UserEvent::Score(category) => {
                let result = self.session.request_score(category);
                self.launch_or_log("score", result);
            }
            UserEvent::BackToTitle => self.session.back_to_title(),
            UserEvent::NameChar(c) => self.session.name_entry_push(c),
            UserEvent::NameBackspace => self.session.name_entry_backspace(),
            UserEvent::SubmitName => {
                let result = self.session.submit_high_score();
                self.launch_or_log("submit high score", result);
            }
            UserEvent::CancelName => {
                self.session.cancel_high_score();
            }
            UserEvent::DismissNotice => self.session.dismiss_notice(),
            UserEvent::Redraw => {}
        }
        Flow::Continue
    }

    pub fn handle_completion(&mut self, completion: Completion) {
        if let Some(next) = self.session.apply(completion) {
            self.launch(next);
        }
    }
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let api = HttpGameApi::new(config.api_url.clone(), config.request_timeout)?;
    let cues: Arc<dyn CuePlayer> = if config.mute {
        Arc::new(Silent)
    } else {
        Arc::new(TerminalBell)
    };
    info!(api = %api, "starting yahtzee client");
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let mut controller = AppController::new(api, cues, config, done_tx);
    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();

    ui::terminal_enter(&mut ui_state)?;
    info!("UI ready");
    let res = run_loop(&mut controller, &mut done_rx, &mut ui_state, &mut input_events).await;
    ui::terminal_exit()?;
    info!("UI closed");
    res
}

fn redraw<A>(controller: &AppController<A>, ui_state: &mut ui::UiState) -> Result<()>
where
    A: GameApi + Clone + Send + Sync + 'static,
{
    let session = controller.session();
    ui::draw(ui_state, &route(session), session.status(), session.notice())
}

async fn run_loop<A>(
    controller: &mut AppController<A>,
    done_rx: &mut mpsc::UnboundedReceiver<Completion>,
    ui_state: &mut ui::UiState,
    input_events: &mut crossterm::event::EventStream,
) -> Result<()>
where
    A: GameApi + Clone + Send + Sync + 'static,
{
    redraw(controller, ui_state).wrap_err("initial draw failed")?;
    loop {
        tokio::select! {
            Some(completion) = done_rx.recv() => {
                controller.handle_completion(completion);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received interrupt, exiting");
                break;
            }
            raw_ev = ui::next_raw_event(input_events) => {
                let event = raw_ev?;
                let mode = controller.input_mode();
                let Some(ev) = ui::interpret_event(ui_state, mode, event) else {
                    continue;
                };
                if controller.handle_event(ev) == Flow::Quit {
                    break;
                }
            }
        }
        redraw(controller, ui_state).wrap_err("draw after update failed")?;
    }
    Ok(())
}
