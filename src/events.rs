//! Event bus shared by every pass and by the output manager.
//!
//! Passes never bump counters directly: they publish an [`Event`] and the bus
//! derives [`Metrics`] from what it sees. Every event is mirrored to `tracing`
//! at debug level, and tests can subscribe to a topic prefix.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Stable event topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Topic {
    PassVisit,
    PassChange,
    PassSkip,
    PassDetect,
    RegistryInsert,
    OutputWrite,
    OutputCopy,
    FileParseError,
}

impl Topic {
    pub const fn as_str(self) -> &'static str {
        match self {
            Topic::PassVisit => "pass.visit",
            Topic::PassChange => "pass.change",
            Topic::PassSkip => "pass.skip",
            Topic::PassDetect => "pass.detect",
            Topic::RegistryInsert => "registry.insert",
            Topic::OutputWrite => "output.write",
            Topic::OutputCopy => "output.copy",
            Topic::FileParseError => "file.parse_error",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a pass left a candidate node alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SkipReason {
    NonLiteralRhs,
    ProhibitedZone,
    AlreadyObfuscated,
    ConstExpression,
    ConstDependency,
    ImplicitRepetition,
    ShortString,
    DenyListed,
    UnresolvedReceiver,
    CrossPackage,
    PromotedField,
    AddressTaken,
    GenericStruct,
    BelowThreshold,
    ControlFlowEscape,
    DuplicateKey,
    UnknownKeyType,
    ChainTooShort,
    NonLiteralKey,
    ScopedInit,
    NameCollision,
    UnexpressibleType,
}

impl SkipReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            SkipReason::NonLiteralRhs => "non-literal-rhs",
            SkipReason::ProhibitedZone => "prohibited-zone",
            SkipReason::AlreadyObfuscated => "already-obfuscated",
            SkipReason::ConstExpression => "const-expression",
            SkipReason::ConstDependency => "const-dependency",
            SkipReason::ImplicitRepetition => "implicit-repetition",
            SkipReason::ShortString => "short-string",
            SkipReason::DenyListed => "deny-listed",
            SkipReason::UnresolvedReceiver => "unresolved-receiver",
            SkipReason::CrossPackage => "cross-package",
            SkipReason::PromotedField => "promoted-field",
            SkipReason::AddressTaken => "address-taken",
            SkipReason::GenericStruct => "generic-struct",
            SkipReason::BelowThreshold => "below-threshold",
            SkipReason::ControlFlowEscape => "control-flow-escape",
            SkipReason::DuplicateKey => "duplicate-key",
            SkipReason::UnknownKeyType => "unknown-key-type",
            SkipReason::ChainTooShort => "chain-too-short",
            SkipReason::NonLiteralKey => "non-literal-key",
            SkipReason::ScopedInit => "scoped-init",
            SkipReason::NameCollision => "name-collision",
            SkipReason::UnexpressibleType => "unexpressible-type",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Empty,
    Skip(SkipReason),
    /// A pattern was recognized but not rewritten.
    Detect { reason: SkipReason, detail: String },
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub topic: Topic,
    pub pass: Option<&'static str>,
    pub path: Option<PathBuf>,
    pub payload: Payload,
}

impl Event {
    pub fn new(topic: Topic) -> Self {
        Self {
            topic,
            pass: None,
            path: None,
            payload: Payload::Empty,
        }
    }

    pub fn pass(mut self, pass: &'static str) -> Self {
        self.pass = Some(pass);
        self
    }

    pub fn path(mut self, path: &Path) -> Self {
        self.path = Some(path.to_path_buf());
        self
    }

    pub fn payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Skip reason carried by skip and detect events.
    pub fn reason(&self) -> Option<SkipReason> {
        match self.payload {
            Payload::Skip(r) | Payload::Detect { reason: r, .. } => Some(r),
            _ => None,
        }
    }
}

/// Counters of one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassMetrics {
    pub visited: usize,
    pub changed: usize,
    pub detected: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
}

impl PassMetrics {
    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }

    pub fn total_skipped(&self) -> usize {
        self.skipped.values().sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metrics {
    pub passes: BTreeMap<&'static str, PassMetrics>,
    pub registered_structs: usize,
    pub files_written: usize,
    pub files_copied: usize,
    pub files_failed: usize,
}

impl Metrics {
    pub fn pass(&self, name: &str) -> Option<&PassMetrics> {
        self.passes.get(name)
    }

    fn observe(&mut self, ev: &Event) {
        match ev.topic {
            Topic::RegistryInsert => self.registered_structs += 1,
            Topic::OutputWrite => self.files_written += 1,
            Topic::OutputCopy => self.files_copied += 1,
            Topic::FileParseError => self.files_failed += 1,
            Topic::PassVisit | Topic::PassChange | Topic::PassSkip | Topic::PassDetect => {
                let Some(pass) = ev.pass else { return };
                let m = self.passes.entry(pass).or_default();
                match ev.topic {
                    Topic::PassVisit => m.visited += 1,
                    Topic::PassChange => m.changed += 1,
                    Topic::PassDetect => {
                        m.detected += 1;
                        if let Some(r) = ev.reason() {
                            *m.skipped.entry(r).or_default() += 1;
                        }
                    }
                    _ => {
                        if let Some(r) = ev.reason() {
                            *m.skipped.entry(r).or_default() += 1;
                        }
                    }
                }
            }
        }
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, m) in &self.passes {
            write!(
                f,
                "{name}: visited={} changed={} skipped={}",
                m.visited,
                m.changed,
                m.total_skipped()
            )?;
            for (reason, n) in &m.skipped {
                write!(f, " {reason}={n}")?;
            }
            writeln!(f)?;
        }
        write!(
            f,
            "structs={} written={} copied={} unparsed={}",
            self.registered_structs, self.files_written, self.files_copied, self.files_failed
        )
    }
}

type Subscriber = Box<dyn FnMut(&Event)>;

#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<(String, Subscriber)>,
    metrics: Metrics,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls `f` for every event whose topic starts with `topic_prefix`.
    pub fn subscribe(&mut self, topic_prefix: &str, f: impl FnMut(&Event) + 'static) {
        self.subscribers
            .push((topic_prefix.to_string(), Box::new(f)));
    }

    pub fn publish(&mut self, ev: Event) {
        tracing::debug!(
            topic = ev.topic.as_str(),
            pass = ev.pass.unwrap_or(""),
            path = %ev.path.as_deref().map(|p| p.display().to_string()).unwrap_or_default(),
            reason = ev.reason().map(SkipReason::as_str).unwrap_or(""),
            "event"
        );
        self.metrics.observe(&ev);
        let topic = ev.topic.as_str();
        for (prefix, f) in &mut self.subscribers {
            if topic.starts_with(prefix.as_str()) {
                f(&ev);
            }
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn metrics_follow_published_events() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.subscribe("pass.", move |ev| sink.borrow_mut().push(ev.topic));

        bus.publish(Event::new(Topic::PassVisit).pass("A"));
        bus.publish(Event::new(Topic::PassChange).pass("A"));
        bus.publish(
            Event::new(Topic::PassSkip)
                .pass("A")
                .payload(Payload::Skip(SkipReason::ShortString)),
        );
        bus.publish(Event::new(Topic::OutputCopy));

        let m = bus.metrics().pass("A").cloned().unwrap_or_default();
        assert_eq!((m.visited, m.changed), (1, 1));
        assert_eq!(m.skipped_for(SkipReason::ShortString), 1);
        assert_eq!(bus.metrics().files_copied, 1);
        assert_eq!(
            *seen.borrow(),
            vec![Topic::PassVisit, Topic::PassChange, Topic::PassSkip]
        );
    }
}
