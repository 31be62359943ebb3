use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::hash::Hash;

/// Role marker of turns produced by the recommender
pub const ASSISTANT_ROLE: &str = "ASST";

/// A closed set of quality aspects scored at one granularity
pub trait Aspect: Copy + Eq + Hash + Ord + Debug + Serialize + 'static {
    /// Every aspect of the granularity, in display order
    const ALL: &'static [Self];
    /// Granularity name used in log events
    const GRANULARITY: &'static str;

    /// Name of the aspect as it appears in gold and run files
    fn name(self) -> &'static str;

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|aspect| aspect.name() == name)
    }
}

/// Aspects scored per assistant utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnAspect {
    Relevance,
    Interestingness,
}

impl Aspect for TurnAspect {
    const ALL: &'static [Self] = &[Self::Relevance, Self::Interestingness];
    const GRANULARITY: &'static str = "turn";

    fn name(self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::Interestingness => "interestingness",
        }
    }
}

/// Aspects scored once per conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueAspect {
    Understanding,
    TaskCompletion,
    InterestArousal,
    Efficiency,
    DialogueOverall,
}

impl Aspect for DialogueAspect {
    const ALL: &'static [Self] = &[
        Self::Understanding,
        Self::TaskCompletion,
        Self::InterestArousal,
        Self::Efficiency,
        Self::DialogueOverall,
    ];
    const GRANULARITY: &'static str = "dialogue";

    fn name(self) -> &'static str {
        match self {
            Self::Understanding => "understanding",
            Self::TaskCompletion => "task_completion",
            Self::InterestArousal => "interest_arousal",
            Self::Efficiency => "efficiency",
            Self::DialogueOverall => "dialogue_overall",
        }
    }
}

/// Source corpus a conversation was sampled from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dataset {
    Redial,
    OpenDialKg,
}

impl Dataset {
    /// Report order of the known datasets
    pub const ORDER: [Dataset; 2] = [Dataset::Redial, Dataset::OpenDialKg];

    pub fn label(self) -> &'static str {
        match self {
            Dataset::Redial => "redial",
            Dataset::OpenDialKg => "opendialkg",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ORDER.into_iter().find(|dataset| dataset.label() == label)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Dataset::Redial => "ReDial",
            Dataset::OpenDialKg => "OpenDialKG",
        }
    }

    /// Key of this dataset's section in a baseline file
    pub fn baseline_key(self) -> &'static str {
        match self {
            Dataset::Redial => "CRSArena-Eval_RD",
            Dataset::OpenDialKg => "CRSArena-Eval_KG",
        }
    }
}

/// Identifies one assistant turn within one conversation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnnotationKey {
    pub conv_id: String,
    pub turn_ind: i64,
}

impl AnnotationKey {
    pub fn new(conv_id: impl Into<String>, turn_ind: i64) -> Self {
        Self {
            conv_id: conv_id.into(),
            turn_ind,
        }
    }
}

pub type DialogueKey = String;

/// Index key that can be traced back to its conversation
pub trait ConversationKey: Eq + Hash + Ord {
    fn conv_id(&self) -> &str;
}

impl ConversationKey for AnnotationKey {
    fn conv_id(&self) -> &str {
        &self.conv_id
    }
}

impl ConversationKey for DialogueKey {
    fn conv_id(&self) -> &str {
        self
    }
}

pub type AspectScoreMap<A> = HashMap<A, f64>;
pub type ScoreIndex<K, A> = HashMap<K, AspectScoreMap<A>>;
pub type TurnIndex = ScoreIndex<AnnotationKey, TurnAspect>;
pub type DialogueIndex = ScoreIndex<DialogueKey, DialogueAspect>;

/// Turn-level and dialogue-level lookups built from one file
#[derive(Debug, Clone, Default)]
pub struct ScoreIndices {
    pub turn: TurnIndex,
    pub dialogue: DialogueIndex,
}

/// Correlation between predicted and gold scores of one group
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Correlation {
    pub pearson: f64,
    pub spearman: f64,
}

impl Correlation {
    pub const UNDEFINED: Correlation = Correlation {
        pearson: f64::NAN,
        spearman: f64::NAN,
    };
}

pub type DatasetMetrics = BTreeMap<Dataset, Correlation>;
pub type GranularityMetrics<A> = BTreeMap<A, DatasetMetrics>;

/// Spearman correlation of one system, per aspect
#[derive(Debug, Clone, Serialize)]
pub struct SystemSpearman {
    pub system: String,
    pub turn_level: BTreeMap<TurnAspect, f64>,
    pub dialogue_level: BTreeMap<DialogueAspect, f64>,
}

/// Published correlations of one baseline evaluator on one dataset
#[derive(Debug, Clone, Serialize)]
pub struct BaselineComparison {
    pub dataset: Dataset,
    pub baseline: String,
    pub turn_level: BTreeMap<TurnAspect, Correlation>,
    pub dialogue_level: BTreeMap<DialogueAspect, Correlation>,
}

/// Complete result of scoring one run file
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub turn_level: GranularityMetrics<TurnAspect>,
    pub dialogue_level: GranularityMetrics<DialogueAspect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_system: Option<Vec<SystemSpearman>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baselines: Option<Vec<BaselineComparison>>,
}
