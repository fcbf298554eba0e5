//! One chat session: turn handling, termination, and deferred captions.

use crate::config::ChatterboxConfig;
use crate::dispatch::Dispatcher;
use crate::fallback::FallbackPolicy;
use crate::random::RandomSource;
use crate::schedule::{Clock, Deferred, Scheduler};
use crate::session::{Session, TurnPath};
use crate::sources::{PreloadJob, build_source};
use crate::termination::TerminationHandler;
use anyhow::Result;
use cb_channels::{PresentationSink, Role};
use cb_sources::ContentKind;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Blank input; nothing rendered, no turn consumed.
    Ignored,
    /// Session already ended; nothing rendered.
    Rejected,
    Responded { kind: ContentKind, fell_back: bool },
    Terminated { fell_back: bool },
}

/// Background bank fills started by [`Conversation::start`].
pub struct PreloadHandle {
    tasks: Vec<JoinHandle<usize>>,
}

impl PreloadHandle {
    /// Wait for every preload and return how many items arrived in total.
    pub async fn wait(self) -> usize {
        let mut total = 0;
        for task in self.tasks {
            match task.await {
                Ok(n) => total += n,
                Err(e) => tracing::warn!(error = %e, "preload task join failed"),
            }
        }
        total
    }
}

pub struct Conversation {
    session: Session,
    dispatcher: Dispatcher,
    terminator: TerminationHandler,
    policy: FallbackPolicy,
    rng: Box<dyn RandomSource>,
    scheduler: Scheduler,
    caption_delay: Duration,
    preloads: Vec<PreloadJob>,
}

impl Conversation {
    pub fn from_config(
        cfg: &ChatterboxConfig,
        mut rng: Box<dyn RandomSource>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let timeout = cfg.http.timeout();
        let fact = build_source(&cfg.sources.resolve(ContentKind::Fact), timeout)?;
        let question = build_source(&cfg.sources.resolve(ContentKind::Question), timeout)?;
        let excuse = build_source(&cfg.sources.resolve(ContentKind::Excuse), timeout)?;

        let preloads = [&fact.preload, &question.preload]
            .into_iter()
            .flatten()
            .cloned()
            .collect();
        let session = Session::new(
            cfg.session.threshold_min,
            cfg.session.threshold_max,
            rng.as_mut(),
        );
        tracing::info!(
            session_id = %session.id,
            termination_threshold = session.termination_threshold(),
            "conversation created"
        );

        Ok(Self {
            session,
            dispatcher: Dispatcher::new(fact.source, fact.profile, question.source, question.profile),
            terminator: TerminationHandler::new(
                excuse.source,
                excuse.profile,
                cfg.session.disabled_placeholder.clone(),
            ),
            policy: FallbackPolicy::new(cfg.decorative_links())?,
            rng,
            scheduler: Scheduler::new(clock),
            caption_delay: cfg.session.caption_delay(),
            preloads,
        })
    }

    /// Kick off bank preloads. They run in the background; turns may begin
    /// before they finish, in which case the banks simply look empty.
    pub fn start(&mut self) -> PreloadHandle {
        let tasks = self
            .preloads
            .drain(..)
            .map(|job| tokio::spawn(job.run()))
            .collect();
        PreloadHandle { tasks }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Ended with nothing left to render.
    pub fn is_finished(&self) -> bool {
        self.session.is_ended() && self.scheduler.is_empty()
    }

    pub fn next_due_in(&self) -> Option<Duration> {
        self.scheduler.next_due_in()
    }

    #[tracing::instrument(
        level = "info",
        skip_all,
        fields(session_id = %self.session.id, turn = self.session.turn_count() + 1)
    )]
    pub async fn on_user_turn(
        &mut self,
        message: &str,
        sink: &dyn PresentationSink,
    ) -> Result<TurnOutcome> {
        let message = message.trim();
        if message.is_empty() {
            return Ok(TurnOutcome::Ignored);
        }
        if self.session.is_ended() {
            tracing::debug!("input after termination rejected");
            return Ok(TurnOutcome::Rejected);
        }

        sink.append_message(message, Role::User).await?;
        let Some(path) = self.session.record_turn() else {
            return Ok(TurnOutcome::Rejected);
        };
        sink.show_pending_indicator().await?;

        let outcome = match path {
            TurnPath::Normal => {
                let reply = self
                    .dispatcher
                    .choose_and_fetch(&self.policy, self.rng.as_mut())
                    .await;
                reply
                    .render(sink, &mut self.scheduler, self.caption_delay)
                    .await
                    .map(|()| TurnOutcome::Responded {
                        kind: reply.kind(),
                        fell_back: reply.fell_back(),
                    })
            }
            TurnPath::Terminate => self
                .terminator
                .terminate(
                    &self.policy,
                    self.rng.as_mut(),
                    sink,
                    &mut self.scheduler,
                    self.caption_delay,
                )
                .await
                .map(|reply| TurnOutcome::Terminated {
                    fell_back: reply.fell_back(),
                }),
        };

        let hidden = sink.hide_pending_indicator().await;
        let outcome = outcome?;
        hidden?;
        tracing::info!(outcome = ?outcome, "turn completed");
        Ok(outcome)
    }

    /// Render every deferred caption that is due. Returns how many rendered.
    pub async fn flush_due(&mut self, sink: &dyn PresentationSink) -> Result<usize> {
        let due = self.scheduler.take_due();
        let count = due.len();
        for task in due {
            match task {
                Deferred::SourceCaption { label, url } => {
                    sink.append_source_caption(&label, &url).await?;
                }
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EXCUSE_FALLBACK, FACT_FALLBACK, QUESTION_FALLBACK};
    use crate::random::ScriptedRandom;
    use crate::schedule::ManualClock;
    use axum::routing::get;
    use axum::{Json, Router};
    use cb_channels::{MemorySink, RenderEvent};

    const OFFLINE: &str = "http://127.0.0.1:9";

    fn config(toml_extra: &str) -> ChatterboxConfig {
        let cfg = ChatterboxConfig::from_toml_str(toml_extra).expect("parse");
        cfg.validate().expect("valid");
        cfg
    }

    fn offline_config() -> ChatterboxConfig {
        config(&format!(
            r#"
[http]
timeout_seconds = 2

[sources.fact]
base_url = "{OFFLINE}"

[sources.question]
base_url = "{OFFLINE}"

[sources.excuse]
base_url = "{OFFLINE}"
"#
        ))
    }

    async fn spawn_upstream(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve");
        });
        format!("http://{addr}")
    }

    fn conversation(
        cfg: &ChatterboxConfig,
        draws: impl IntoIterator<Item = f64>,
    ) -> (Conversation, ManualClock) {
        let clock = ManualClock::new();
        let conversation = Conversation::from_config(
            cfg,
            Box::new(ScriptedRandom::new(draws)),
            Arc::new(clock.clone()),
        )
        .expect("conversation");
        (conversation, clock)
    }

    #[tokio::test]
    async fn whitespace_input_renders_nothing_and_consumes_no_turn() {
        let cfg = offline_config();
        let (mut conv, _clock) = conversation(&cfg, [0.0]);
        let sink = MemorySink::new();

        let outcome = conv.on_user_turn("   \t\n", &sink).await.expect("turn");
        assert_eq!(outcome, TurnOutcome::Ignored);
        assert!(sink.events().is_empty());
        assert_eq!(conv.session().turn_count(), 0);
    }

    #[tokio::test]
    async fn offline_session_falls_back_every_turn_then_terminates_on_threshold() {
        let cfg = offline_config();
        // threshold draw 0.0 -> 4; then fact, question, exactly-0.5 question.
        let (mut conv, _clock) = conversation(&cfg, [0.0, 0.9, 0.1, 0.5]);
        conv.start().wait().await;
        let sink = MemorySink::new();

        let mut outcomes = Vec::new();
        for msg in ["hi", "tell me something", "another", "and one more"] {
            outcomes.push(conv.on_user_turn(msg, &sink).await.expect("turn"));
        }
        assert_eq!(
            outcomes,
            vec![
                TurnOutcome::Responded {
                    kind: ContentKind::Fact,
                    fell_back: true
                },
                TurnOutcome::Responded {
                    kind: ContentKind::Question,
                    fell_back: true
                },
                TurnOutcome::Responded {
                    kind: ContentKind::Question,
                    fell_back: true
                },
                TurnOutcome::Terminated { fell_back: true },
            ]
        );
        assert_eq!(
            sink.bot_messages(),
            vec![
                FACT_FALLBACK.to_string(),
                QUESTION_FALLBACK.to_string(),
                QUESTION_FALLBACK.to_string(),
                EXCUSE_FALLBACK.to_string(),
            ]
        );
        assert!(sink.is_input_disabled());
        assert!(!sink.is_pending());
        assert!(conv.is_finished(), "fallbacks schedule no captions");

        let before = sink.events().len();
        let outcome = conv.on_user_turn("hello?", &sink).await.expect("turn");
        assert_eq!(outcome, TurnOutcome::Rejected);
        assert_eq!(sink.events().len(), before);
        assert_eq!(conv.session().turn_count(), 4);
    }

    #[tokio::test]
    async fn turn_renders_user_message_indicator_and_reply_in_order() {
        let cfg = offline_config();
        let (mut conv, _clock) = conversation(&cfg, [0.999, 0.9]);
        let sink = MemorySink::new();

        conv.on_user_turn("  hello  ", &sink).await.expect("turn");
        assert_eq!(
            sink.events(),
            vec![
                RenderEvent::Message {
                    role: Role::User,
                    content: "hello".to_string()
                },
                RenderEvent::Typing { active: true },
                RenderEvent::Message {
                    role: Role::Bot,
                    content: FACT_FALLBACK.to_string()
                },
                RenderEvent::Typing { active: false },
            ]
        );
    }

    #[tokio::test]
    async fn preloaded_bank_is_drawn_lifo_with_delayed_captions() {
        let router = Router::new()
            .route(
                "/facts",
                get(|| async {
                    Json(serde_json::json!({
                        "data": [{"fact": "one"}, {"fact": "two"}]
                    }))
                }),
            )
            .route(
                "/",
                get(|| async { Json(serde_json::json!({"phrase": "align our verticals"})) }),
            );
        let base = spawn_upstream(router).await;
        let cfg = config(&format!(
            r#"
[session]
threshold_min = 4
threshold_max = 4

[sources.fact]
base_url = "{base}"

[sources.question]
base_url = "{OFFLINE}"

[sources.excuse]
base_url = "{base}"
"#
        ));
        // turn1 fact + link, turn2 fact + link, turn3 fact (bank empty), turn4 excuse + link.
        let (mut conv, clock) = conversation(&cfg, [0.9, 0.0, 0.9, 0.99, 0.9, 0.5]);
        assert_eq!(conv.start().wait().await, 2);
        let sink = MemorySink::new();

        conv.on_user_turn("a", &sink).await.expect("turn 1");
        assert_eq!(sink.bot_messages(), vec!["two".to_string()]);
        assert!(sink.captions().is_empty(), "caption waits for its delay");
        assert_eq!(conv.next_due_in(), Some(Duration::from_millis(600)));

        clock.advance(Duration::from_millis(599));
        assert_eq!(conv.flush_due(&sink).await.expect("flush"), 0);
        clock.advance(Duration::from_millis(1));
        assert_eq!(conv.flush_due(&sink).await.expect("flush"), 1);
        assert_eq!(
            sink.captions(),
            vec![(
                "The Cat's Meow".to_string(),
                "https://pointerpointer.com/".to_string()
            )]
        );

        conv.on_user_turn("b", &sink).await.expect("turn 2");
        conv.on_user_turn("c", &sink).await.expect("turn 3");
        let outcome = conv.on_user_turn("d", &sink).await.expect("turn 4");
        assert_eq!(outcome, TurnOutcome::Terminated { fell_back: false });
        assert!(!conv.is_finished(), "sign-off caption still pending");

        clock.advance(Duration::from_millis(600));
        assert_eq!(conv.flush_due(&sink).await.expect("flush"), 2);
        assert!(conv.is_finished());

        assert_eq!(
            sink.bot_messages(),
            vec![
                "two".to_string(),
                "one".to_string(),
                FACT_FALLBACK.to_string(),
                "SESSION TERMINATED. I must attend to a critical task: align our verticals."
                    .to_string(),
            ]
        );

        // Every caption lands after the message it belongs to.
        let events = sink.events();
        let position = |needle: &RenderEvent| {
            events
                .iter()
                .position(|e| e == needle)
                .expect("event rendered")
        };
        let two = position(&RenderEvent::Message {
            role: Role::Bot,
            content: "two".to_string(),
        });
        let first_caption = events
            .iter()
            .position(|e| matches!(e, RenderEvent::Source { .. }))
            .expect("caption");
        assert!(two < first_caption);
        let disabled = position(&RenderEvent::InputDisabled {
            placeholder: "Session terminated. Try again later.".to_string(),
        });
        let last_caption = events
            .iter()
            .rposition(|e| matches!(e, RenderEvent::Source { .. }))
            .expect("caption");
        assert!(disabled < last_caption, "sign-off caption is deferred too");
        assert_eq!(
            sink.captions().last().map(|(label, _)| label.as_str()),
            Some("My Corporate Synergy Memo")
        );
    }

    #[tokio::test]
    async fn turn_before_preload_completes_sees_an_empty_bank() {
        let cfg = offline_config();
        let (mut conv, _clock) = conversation(&cfg, [0.0, 0.9]);
        let sink = MemorySink::new();

        // start() never awaited before the first turn.
        let preload = conv.start();
        let outcome = conv.on_user_turn("quick", &sink).await.expect("turn");
        assert_eq!(
            outcome,
            TurnOutcome::Responded {
                kind: ContentKind::Fact,
                fell_back: true
            }
        );
        assert_eq!(preload.wait().await, 0);
    }
}
