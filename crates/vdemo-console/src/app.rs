use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, info, warn};
use vdemo_core::{route, CommandSink, Dispatcher, Feeds, Routed, Selection};
use vdemo_link::{LinkEvent, LinkState};

const MAX_BATCH_DIGITS: usize = 9;

/// A consumer-expectation or publish button: key, label, topic, version.
pub struct Choice {
    pub key: char,
    pub label: &'static str,
    pub topic: &'static str,
    pub version: &'static str,
}

pub const CONSUMER_CHOICES: [Choice; 3] = [
    Choice {
        key: '1',
        label: "1.0",
        topic: "person-v1",
        version: "0",
    },
    Choice {
        key: '2',
        label: "1.1",
        topic: "person-v1",
        version: "1",
    },
    Choice {
        key: '3',
        label: "2.0",
        topic: "person-v2",
        version: "0",
    },
];

pub const PUBLISH_CHOICES: [Choice; 3] = [
    Choice {
        key: 'a',
        label: "1.0",
        topic: "person-v1",
        version: "1",
    },
    Choice {
        key: 's',
        label: "1.1",
        topic: "person-v1",
        version: "2",
    },
    Choice {
        key: 'd',
        label: "2.0",
        topic: "person-v2",
        version: "na",
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    EditBatch(String),
}

pub struct App<S> {
    pub feeds: Feeds,
    pub dispatcher: Dispatcher<S>,
    pub link_state: LinkState,
    pub input: InputMode,
    pub help_open: bool,
    pub status_note: Option<String>,
    pub last_routed: Option<Routed>,
    pub decode_failures: u64,
    pub log_path: Option<String>,
}

impl<S: CommandSink> App<S> {
    pub fn new(sink: S, selection: Selection) -> Self {
        Self {
            feeds: Feeds::new(),
            dispatcher: Dispatcher::new(sink, selection),
            link_state: LinkState::Connecting,
            input: InputMode::Normal,
            help_open: false,
            status_note: None,
            last_routed: None,
            decode_failures: 0,
            log_path: None,
        }
    }

    pub fn into_sink(self) -> S {
        self.dispatcher.into_sink()
    }

    fn note(&mut self, message: impl Into<String>) {
        self.status_note = Some(format!("{} {}", Local::now().format("%H:%M:%S"), message.into()));
    }

    pub fn apply_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::State(state) => {
                self.link_state = state;
                match state {
                    LinkState::Connecting => self.note("connecting to backend"),
                    LinkState::Ready => self.note("connected; streaming topics"),
                    LinkState::Closed => self.note("connection closed; display no longer updating"),
                }
            }
            LinkEvent::Envelope(envelope) => {
                let routed = route(envelope, &mut self.feeds);
                if routed.created {
                    info!(
                        event = "feed_bucket_created",
                        sink = routed.sink.label(),
                        key = %routed.key
                    );
                } else {
                    debug!(
                        event = "feed_append",
                        sink = routed.sink.label(),
                        key = %routed.key,
                        records = routed.appended
                    );
                }
                self.last_routed = Some(routed);
            }
            LinkEvent::DecodeFailed(err) => {
                self.decode_failures += 1;
                self.note(format!("skipped undecodable message: {err}"));
            }
            LinkEvent::Failed(err) => {
                self.note(format!("connection failed: {err}"));
            }
        }
    }

    /// Returns true when the operator asked to quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }
        if let InputMode::EditBatch(_) = self.input {
            self.handle_batch_edit(key);
            return false;
        }
        if matches!(key.code, KeyCode::Char('?') | KeyCode::F(1)) {
            self.help_open = !self.help_open;
            return false;
        }
        if key.code == KeyCode::Esc && self.help_open {
            self.help_open = false;
            return false;
        }
        if self.help_open {
            return false;
        }

        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('b') => {
                let current = self.dispatcher.selection().batch_count().to_string();
                self.input = InputMode::EditBatch(current);
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.dispatcher.step_batch_count(1),
            KeyCode::Char('-') => self.dispatcher.step_batch_count(-1),
            KeyCode::Char(ch) => {
                if let Some(choice) = CONSUMER_CHOICES.iter().find(|choice| choice.key == ch) {
                    self.select_consumer(choice.topic, choice.version);
                } else if let Some(choice) = PUBLISH_CHOICES.iter().find(|choice| choice.key == ch)
                {
                    self.publish(choice.topic, choice.version);
                }
            }
            _ => {}
        }
        false
    }

    fn handle_batch_edit(&mut self, key: KeyEvent) {
        let InputMode::EditBatch(buffer) = &mut self.input else {
            return;
        };
        match key.code {
            KeyCode::Char(ch) if ch.is_ascii_digit() => {
                if buffer.len() < MAX_BATCH_DIGITS {
                    buffer.push(ch);
                }
            }
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Esc => {
                self.input = InputMode::Normal;
            }
            KeyCode::Enter => {
                let text = std::mem::take(buffer);
                self.input = InputMode::Normal;
                match self.dispatcher.set_batch_count_text(&text) {
                    Ok(()) => {
                        let count = self.dispatcher.selection().batch_count();
                        self.note(format!("batch size set to {count}"));
                    }
                    Err(err) => self.note(err.to_string()),
                }
            }
            _ => {}
        }
    }

    pub fn select_consumer(&mut self, topic: &str, version: &str) {
        match self.dispatcher.set_consumer_expectation(topic, version) {
            Ok(key) => {
                let key = key.to_string();
                self.note(format!("consumer now expects {key}"));
            }
            Err(err) => {
                warn!(event = "consumer_selection_rejected", error = %err);
                self.note(err.to_string());
            }
        }
    }

    pub fn publish(&mut self, topic: &str, version: &str) {
        match self.dispatcher.request_publish(topic, version) {
            Ok(false) => {
                self.note(format!(
                    "backend not ready; publish to {topic} v{version} not sent"
                ));
            }
            Ok(true) => {
                let count = self.dispatcher.selection().batch_count();
                info!(
                    event = "publish_requested",
                    topic,
                    version,
                    batch_count = count
                );
                self.note(format!("requested {count} records on {topic} v{version}"));
            }
            Err(err) => {
                warn!(event = "publish_rejected", error = %err);
                self.note(err.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventKind;
    use serde_json::json;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use vdemo_core::{decode_envelope, Command, Envelope, Record};

    /// Shared with the test so it can inspect what the app sent. Commands are
    /// only accepted while `open` is set, like a link that is Ready.
    #[derive(Clone, Default)]
    struct RecordingSink {
        sent: Rc<RefCell<Vec<Command>>>,
        open: Rc<Cell<bool>>,
    }

    impl RecordingSink {
        fn sent(&self) -> Vec<Command> {
            self.sent.borrow().clone()
        }
    }

    impl CommandSink for RecordingSink {
        fn send(&self, command: Command) -> bool {
            if !self.open.get() {
                return false;
            }
            self.sent.borrow_mut().push(command);
            true
        }
    }

    fn ready_app() -> (App<RecordingSink>, RecordingSink) {
        let sink = RecordingSink::default();
        sink.open.set(true);
        let mut app = App::new(sink.clone(), Selection::default());
        app.apply_link_event(LinkEvent::State(LinkState::Ready));
        (app, sink)
    }

    fn press(app: &mut App<RecordingSink>, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn note(app: &App<RecordingSink>) -> &str {
        app.status_note.as_deref().unwrap_or_default()
    }

    #[test]
    fn consumer_keys_switch_bucket_without_sending() {
        let (mut app, sink) = ready_app();
        press(&mut app, KeyCode::Char('2'));
        assert_eq!(app.dispatcher.selection().bucket(), "person-v1.1");
        press(&mut app, KeyCode::Char('3'));
        assert_eq!(app.dispatcher.selection().bucket(), "person-v2.0");
        press(&mut app, KeyCode::Char('1'));
        assert_eq!(app.dispatcher.selection().bucket(), "person-v1.0");
        assert!(sink.sent().is_empty());
    }

    #[test]
    fn publish_key_sends_play_stream_and_leaves_feeds_alone() {
        let (mut app, sink) = ready_app();
        app.dispatcher.set_batch_count(5).expect("positive");
        press(&mut app, KeyCode::Char('a'));

        assert_eq!(
            sink.sent(),
            vec![Command::PlayStream {
                batch_count: 5,
                stream_topic: "person-v1".to_string(),
                stream_version: "1".to_string(),
            }]
        );
        assert_eq!(app.feeds.producer.total(), 0);
        assert_eq!(app.feeds.consumer.total(), 0);
    }

    #[test]
    fn publish_choices_cover_every_backend_target() {
        let (mut app, sink) = ready_app();
        for code in ['a', 's', 'd'] {
            press(&mut app, KeyCode::Char(code));
        }
        let targets: Vec<_> = sink.sent()
            .into_iter()
            .map(|command| match command {
                Command::PlayStream {
                    stream_topic,
                    stream_version,
                    ..
                } => format!("{stream_topic}/{stream_version}"),
                other => panic!("unexpected command: {other:?}"),
            })
            .collect();
        assert_eq!(targets, vec!["person-v1/1", "person-v1/2", "person-v2/na"]);
    }

    #[test]
    fn batch_editor_commits_and_cancels() {
        let (mut app, _sink) = ready_app();
        press(&mut app, KeyCode::Char('b'));
        assert_eq!(app.input, InputMode::EditBatch("3".to_string()));
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Char('1'));
        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Char('x'));
        assert_eq!(app.input, InputMode::EditBatch("12".to_string()));
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.input, InputMode::Normal);
        assert_eq!(app.dispatcher.selection().batch_count(), 12);

        press(&mut app, KeyCode::Char('b'));
        press(&mut app, KeyCode::Char('9'));
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.dispatcher.selection().batch_count(), 12);
    }

    #[test]
    fn batch_editor_rejects_zero() {
        let (mut app, _sink) = ready_app();
        press(&mut app, KeyCode::Char('b'));
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Char('0'));
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.dispatcher.selection().batch_count(), 3);
        assert!(app
            .status_note
            .as_deref()
            .unwrap_or_default()
            .contains("positive integer"));
    }

    #[test]
    fn envelopes_route_into_feeds() {
        let (mut app, _sink) = ready_app();
        let producer = decode_envelope(
            &json!({
                "display_area": "producer",
                "topic_name": "person-v1",
                "messages": [{"timestamp": "t1", "version": "1", "name": "Alice"}]
            })
            .to_string(),
        )
        .expect("decode");
        app.apply_link_event(LinkEvent::Envelope(producer));
        app.apply_link_event(LinkEvent::Envelope(Envelope::ConsumerBucket {
            key: "person-v1.0".to_string(),
            messages: vec![Record::new("t2", "W1", "Bob")],
        }));

        assert_eq!(
            app.feeds.producer.get("person-v1"),
            &[Record::new("t1", "1", "Alice")]
        );
        assert_eq!(app.feeds.consumer.get("person-v1.0").len(), 1);
        assert_eq!(app.feeds.consumer.get("person-v1.1").len(), 0);
        assert_eq!(
            app.last_routed.as_ref().map(|routed| routed.key.as_str()),
            Some("person-v1.0")
        );
    }

    #[test]
    fn repeated_ready_does_not_touch_feeds() {
        let (mut app, _sink) = ready_app();
        app.apply_link_event(LinkEvent::Envelope(Envelope::ConsumerBucket {
            key: "person-v2.0".to_string(),
            messages: vec![Record::new("t", "2.0", "Erin")],
        }));
        app.apply_link_event(LinkEvent::State(LinkState::Ready));
        app.apply_link_event(LinkEvent::State(LinkState::Ready));
        assert_eq!(app.feeds.consumer.get("person-v2.0").len(), 1);
        assert_eq!(app.feeds.consumer.total(), 1);
    }

    #[test]
    fn decode_failure_is_counted_and_isolated() {
        let (mut app, _sink) = ready_app();
        app.apply_link_event(LinkEvent::DecodeFailed("expected value".to_string()));
        assert_eq!(app.decode_failures, 1);
        assert_eq!(app.feeds.producer.total() + app.feeds.consumer.total(), 0);
        assert_eq!(app.link_state, LinkState::Ready);
    }

    #[test]
    fn publish_while_connecting_is_reported() {
        let mut app = App::new(RecordingSink::default(), Selection::default());
        press(&mut app, KeyCode::Char('d'));
        assert!(note(&app).contains("not sent"));
    }

    #[test]
    fn publish_note_follows_the_sink_not_the_last_event() {
        // The link became Ready before its event reached the app.
        let sink = RecordingSink::default();
        sink.open.set(true);
        let mut app = App::new(sink.clone(), Selection::default());
        assert_eq!(app.link_state, LinkState::Connecting);
        press(&mut app, KeyCode::Char('a'));
        assert_eq!(sink.sent().len(), 1);
        assert!(note(&app).contains("requested 3 records on person-v1 v1"));

        // The link closed before its event reached the app.
        let (mut app, sink) = ready_app();
        sink.open.set(false);
        press(&mut app, KeyCode::Char('s'));
        assert!(sink.sent().is_empty());
        assert!(note(&app).contains("not sent"));
    }

    #[test]
    fn help_swallows_keys_until_closed() {
        let (mut app, sink) = ready_app();
        press(&mut app, KeyCode::Char('?'));
        assert!(app.help_open);
        press(&mut app, KeyCode::Char('a'));
        assert!(sink.sent().is_empty());
        assert!(!press(&mut app, KeyCode::Char('q')));
        press(&mut app, KeyCode::Esc);
        assert!(!app.help_open);
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn ctrl_c_quits_from_any_mode() {
        let (mut app, _sink) = ready_app();
        press(&mut app, KeyCode::Char('b'));
        let mut key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        key.kind = KeyEventKind::Press;
        assert!(app.handle_key(key));
    }
}
