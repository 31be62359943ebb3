use crate::dataset::{classify, system_id};
use crate::error::EvalResult;
use crate::models::{
    Aspect, AspectScoreMap, ConversationKey, Correlation, Dataset, DatasetMetrics, DialogueAspect,
    GranularityMetrics, ScoreIndex, ScoreIndices, SystemSpearman, TurnAspect,
};
use crate::stats::{pearson, spearman};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// A gold score joined with the prediction for the same key and aspect
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricRecord {
    /// `None` when the conversation's label is not a reported dataset
    pub dataset: Option<Dataset>,
    pub predicted: f64,
    pub gold: f64,
}

/// Predicted and gold sequences, paired by position
#[derive(Debug, Clone, Default)]
struct PairedScores {
    predicted: Vec<f64>,
    gold: Vec<f64>,
}

impl PairedScores {
    fn push(&mut self, predicted: f64, gold: f64) {
        self.predicted.push(predicted);
        self.gold.push(gold);
    }

    fn len(&self) -> usize {
        self.predicted.len()
    }

    fn correlation(&self) -> Correlation {
        if self.predicted.is_empty() {
            return Correlation::UNDEFINED;
        }
        Correlation {
            pearson: pearson(&self.predicted, &self.gold),
            spearman: spearman(&self.predicted, &self.gold),
        }
    }
}

/// Correlate predictions with gold for every aspect of one granularity
pub fn evaluate_granularity<K, A>(
    gold: &ScoreIndex<K, A>,
    preds: &ScoreIndex<K, A>,
) -> EvalResult<GranularityMetrics<A>>
where
    K: ConversationKey,
    A: Aspect,
{
    let mut results = GranularityMetrics::new();
    let mut matched_per_dataset: BTreeMap<Dataset, usize> = BTreeMap::new();

    for &aspect in A::ALL {
        let records = matched_records(gold, preds, aspect)?;
        for record in &records {
            if let Some(dataset) = record.dataset {
                *matched_per_dataset.entry(dataset).or_insert(0) += 1;
            }
        }
        results.insert(aspect, compute_metrics(&records));
    }

    for dataset in Dataset::ORDER {
        if !matched_per_dataset.contains_key(&dataset) {
            warn!(
                granularity = A::GRANULARITY,
                dataset = dataset.label(),
                "no matched records for any aspect"
            );
        }
    }

    Ok(results)
}

/// Join gold and predictions on key and aspect.
///
/// Keys without a prediction for the aspect are skipped. Records follow
/// key order, so repeated runs sum in the same order.
pub fn matched_records<K, A>(
    gold: &ScoreIndex<K, A>,
    preds: &ScoreIndex<K, A>,
    aspect: A,
) -> EvalResult<Vec<MetricRecord>>
where
    K: ConversationKey,
    A: Aspect,
{
    let mut records = Vec::new();

    for (key, gold_scores) in sorted_entries(gold) {
        let Some(&gold_value) = gold_scores.get(&aspect) else {
            continue;
        };
        let Some(&predicted) = preds.get(key).and_then(|scores| scores.get(&aspect)) else {
            continue;
        };
        records.push(MetricRecord {
            dataset: classify(key.conv_id())?,
            predicted,
            gold: gold_value,
        });
    }

    Ok(records)
}

/// Group records by dataset and correlate each known dataset
pub fn compute_metrics(records: &[MetricRecord]) -> DatasetMetrics {
    let mut groups: BTreeMap<Dataset, PairedScores> = BTreeMap::new();
    for record in records {
        let Some(dataset) = record.dataset else {
            continue;
        };
        groups
            .entry(dataset)
            .or_default()
            .push(record.predicted, record.gold);
    }

    Dataset::ORDER
        .into_iter()
        .map(|dataset| {
            let correlation = match groups.get(&dataset) {
                Some(pairs) => {
                    debug!(dataset = dataset.label(), records = pairs.len(), "correlating");
                    pairs.correlation()
                }
                None => Correlation::UNDEFINED,
            };
            (dataset, correlation)
        })
        .collect()
}

#[derive(Debug, Default)]
struct SystemBuckets {
    turn: BTreeMap<TurnAspect, PairedScores>,
    dialogue: BTreeMap<DialogueAspect, PairedScores>,
}

/// Spearman correlation per system and aspect over both granularities.
///
/// A system appears once any of its keys has a prediction, even if no aspect
/// matched; its empty buckets report NaN. Systems are sorted by id.
pub fn per_system_spearman(
    gold: &ScoreIndices,
    preds: &ScoreIndices,
) -> EvalResult<Vec<SystemSpearman>> {
    let mut systems: BTreeMap<String, SystemBuckets> = BTreeMap::new();

    bucket_by_system(&gold.turn, &preds.turn, &mut systems, |b| &mut b.turn)?;
    bucket_by_system(&gold.dialogue, &preds.dialogue, &mut systems, |b| {
        &mut b.dialogue
    })?;

    Ok(systems
        .into_iter()
        .map(|(system, buckets)| SystemSpearman {
            system,
            turn_level: spearman_by_aspect(&buckets.turn),
            dialogue_level: spearman_by_aspect(&buckets.dialogue),
        })
        .collect())
}

fn bucket_by_system<K, A>(
    gold: &ScoreIndex<K, A>,
    preds: &ScoreIndex<K, A>,
    systems: &mut BTreeMap<String, SystemBuckets>,
    select: fn(&mut SystemBuckets) -> &mut BTreeMap<A, PairedScores>,
) -> EvalResult<()>
where
    K: ConversationKey,
    A: Aspect,
{
    for (key, gold_scores) in sorted_entries(gold) {
        let Some(pred_scores) = preds.get(key) else {
            continue;
        };
        let buckets = select(systems.entry(system_id(key.conv_id())?).or_default());

        for aspect in A::ALL {
            if let (Some(&g), Some(&p)) = (gold_scores.get(aspect), pred_scores.get(aspect)) {
                buckets.entry(*aspect).or_default().push(p, g);
            }
        }
    }
    Ok(())
}

fn sorted_entries<K: ConversationKey, A: Aspect>(
    index: &ScoreIndex<K, A>,
) -> Vec<(&K, &AspectScoreMap<A>)> {
    let mut entries: Vec<_> = index.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

fn spearman_by_aspect<A: Aspect>(buckets: &BTreeMap<A, PairedScores>) -> BTreeMap<A, f64> {
    A::ALL
        .iter()
        .map(|aspect| {
            let rho = buckets
                .get(aspect)
                .map_or(f64::NAN, |pairs| pairs.correlation().spearman);
            (*aspect, rho)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;
    use crate::models::{AnnotationKey, DialogueIndex, TurnIndex};

    const EPS: f64 = 1e-9;

    fn turn_scores(pairs: &[(TurnAspect, f64)]) -> AspectScoreMap<TurnAspect> {
        pairs.iter().copied().collect()
    }

    fn dial_scores(pairs: &[(DialogueAspect, f64)]) -> AspectScoreMap<DialogueAspect> {
        pairs.iter().copied().collect()
    }

    fn assert_undefined(c: &Correlation) {
        assert!(c.pearson.is_nan() && c.spearman.is_nan(), "expected NaN, got {:?}", c);
    }

    #[test]
    fn test_single_pair_is_degenerate() {
        let mut gold = TurnIndex::new();
        gold.insert(
            AnnotationKey::new("d_redial_1", 0),
            turn_scores(&[(TurnAspect::Relevance, 4.0)]),
        );
        let mut preds = TurnIndex::new();
        preds.insert(
            AnnotationKey::new("d_redial_1", 0),
            turn_scores(&[(TurnAspect::Relevance, 3.0)]),
        );

        let records = matched_records(&gold, &preds, TurnAspect::Relevance).unwrap();
        assert_eq!(
            records,
            vec![MetricRecord {
                dataset: Some(Dataset::Redial),
                predicted: 3.0,
                gold: 4.0
            }]
        );

        let results = evaluate_granularity(&gold, &preds).unwrap();
        assert_undefined(&results[&TurnAspect::Relevance][&Dataset::Redial]);
        assert_undefined(&results[&TurnAspect::Relevance][&Dataset::OpenDialKg]);
    }

    #[test]
    fn test_perfect_correlation_per_dataset() {
        let mut gold = DialogueIndex::new();
        let mut preds = DialogueIndex::new();
        for (i, value) in [1.0, 2.0, 3.0].into_iter().enumerate() {
            for prefix in ["a_redial", "b_opendialkg"] {
                let conv_id = format!("{}_{}", prefix, i);
                gold.insert(conv_id.clone(), dial_scores(&[(DialogueAspect::Efficiency, value)]));
                preds.insert(conv_id, dial_scores(&[(DialogueAspect::Efficiency, value)]));
            }
        }

        let results = evaluate_granularity(&gold, &preds).unwrap();
        for dataset in Dataset::ORDER {
            let c = results[&DialogueAspect::Efficiency][&dataset];
            assert!((c.pearson - 1.0).abs() < EPS);
            assert!((c.spearman - 1.0).abs() < EPS);
        }
        assert_undefined(&results[&DialogueAspect::Understanding][&Dataset::Redial]);
    }

    #[test]
    fn test_absent_aspect_is_nan_everywhere() {
        let mut gold = TurnIndex::new();
        let mut preds = TurnIndex::new();
        for i in 0..4 {
            let key = AnnotationKey::new("x_redial_1", i);
            gold.insert(key.clone(), turn_scores(&[(TurnAspect::Relevance, i as f64)]));
            preds.insert(key, turn_scores(&[(TurnAspect::Relevance, i as f64)]));
        }

        let results = evaluate_granularity(&gold, &preds).unwrap();
        let interestingness = &results[&TurnAspect::Interestingness];
        assert_eq!(interestingness.len(), Dataset::ORDER.len());
        for correlation in interestingness.values() {
            assert_undefined(correlation);
        }
    }

    #[test]
    fn test_matching_is_key_exact() {
        let mut gold = TurnIndex::new();
        gold.insert(
            AnnotationKey::new("d_redial_1", 4),
            turn_scores(&[(TurnAspect::Relevance, 4.0)]),
        );
        let mut preds = TurnIndex::new();
        preds.insert(
            AnnotationKey::new("d_redial_1", 3),
            turn_scores(&[(TurnAspect::Relevance, 4.0)]),
        );

        assert!(matched_records(&gold, &preds, TurnAspect::Relevance).unwrap().is_empty());
    }

    #[test]
    fn test_prediction_without_aspect_is_skipped() {
        let mut gold = DialogueIndex::new();
        gold.insert(
            "s_redial_1".to_string(),
            dial_scores(&[(DialogueAspect::Understanding, 2.0), (DialogueAspect::Efficiency, 3.0)]),
        );
        let mut preds = DialogueIndex::new();
        preds.insert("s_redial_1".to_string(), dial_scores(&[(DialogueAspect::Efficiency, 1.0)]));

        assert!(matched_records(&gold, &preds, DialogueAspect::Understanding).unwrap().is_empty());
        assert_eq!(matched_records(&gold, &preds, DialogueAspect::Efficiency).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_dataset_is_dropped() {
        let records = vec![
            MetricRecord { dataset: None, predicted: 1.0, gold: 1.0 },
            MetricRecord { dataset: None, predicted: 2.0, gold: 2.0 },
            MetricRecord { dataset: Some(Dataset::Redial), predicted: 1.0, gold: 3.0 },
            MetricRecord { dataset: Some(Dataset::Redial), predicted: 2.0, gold: 2.0 },
            MetricRecord { dataset: Some(Dataset::Redial), predicted: 3.0, gold: 1.0 },
        ];

        let metrics = compute_metrics(&records);
        assert_eq!(metrics.len(), 2);
        assert!((metrics[&Dataset::Redial].pearson + 1.0).abs() < EPS);
        assert_undefined(&metrics[&Dataset::OpenDialKg]);
    }

    #[test]
    fn test_records_keep_pairing() {
        let mut gold = TurnIndex::new();
        let mut preds = TurnIndex::new();
        let points = [(1.0, 10.0), (2.0, 30.0), (3.0, 20.0), (4.0, 40.0)];
        for (i, (p, g)) in points.into_iter().enumerate() {
            let key = AnnotationKey::new("m_opendialkg_9", i as i64);
            gold.insert(key.clone(), turn_scores(&[(TurnAspect::Interestingness, g)]));
            preds.insert(key, turn_scores(&[(TurnAspect::Interestingness, p)]));
        }

        let results = evaluate_granularity(&gold, &preds).unwrap();
        let c = results[&TurnAspect::Interestingness][&Dataset::OpenDialKg];
        // ranks of gold: 1, 3, 2, 4 against 1, 2, 3, 4
        assert!((c.spearman - 0.8).abs() < EPS);
    }

    #[test]
    fn test_idempotent() {
        let mut gold = TurnIndex::new();
        let mut preds = TurnIndex::new();
        for i in 0..20 {
            let key = AnnotationKey::new(format!("sys{}_redial_{}", i % 3, i), i);
            gold.insert(key.clone(), turn_scores(&[(TurnAspect::Relevance, (i % 5) as f64)]));
            preds.insert(key, turn_scores(&[(TurnAspect::Relevance, (i * 7 % 11) as f64 / 3.0)]));
        }

        let first = evaluate_granularity(&gold, &preds).unwrap();
        let second = evaluate_granularity(&gold, &preds).unwrap();
        let a = first[&TurnAspect::Relevance][&Dataset::Redial];
        let b = second[&TurnAspect::Relevance][&Dataset::Redial];
        assert_eq!(a.pearson.to_bits(), b.pearson.to_bits());
        assert_eq!(a.spearman.to_bits(), b.spearman.to_bits());
    }

    #[test]
    fn test_records_follow_key_order() {
        let build = |order: &[i64]| {
            let mut gold = TurnIndex::new();
            let mut preds = TurnIndex::new();
            for &i in order {
                let key = AnnotationKey::new(format!("c{}_redial_1", i % 4), i);
                gold.insert(key.clone(), turn_scores(&[(TurnAspect::Relevance, i as f64)]));
                preds.insert(key, turn_scores(&[(TurnAspect::Relevance, 0.1 * i as f64)]));
            }
            matched_records(&gold, &preds, TurnAspect::Relevance).unwrap()
        };

        let forward: Vec<i64> = (0..12).collect();
        let backward: Vec<i64> = (0..12).rev().collect();
        let first = build(&forward);
        assert_eq!(first, build(&backward));

        let golds: Vec<f64> = first.iter().map(|r| r.gold).collect();
        assert_eq!(
            golds,
            vec![0.0, 4.0, 8.0, 1.0, 5.0, 9.0, 2.0, 6.0, 10.0, 3.0, 7.0, 11.0]
        );
    }

    #[test]
    fn test_malformed_conv_id_fails_when_matched() {
        let mut gold = DialogueIndex::new();
        gold.insert("broken".to_string(), dial_scores(&[(DialogueAspect::Efficiency, 1.0)]));
        let mut preds = DialogueIndex::new();
        preds.insert("broken".to_string(), dial_scores(&[(DialogueAspect::Efficiency, 1.0)]));

        let err = evaluate_granularity(&gold, &preds).unwrap_err();
        assert!(matches!(err, EvalError::MalformedConvId(_)));
    }

    #[test]
    fn test_malformed_conv_id_ignored_when_unmatched() {
        let mut gold = DialogueIndex::new();
        gold.insert("broken".to_string(), dial_scores(&[(DialogueAspect::Efficiency, 1.0)]));

        assert!(evaluate_granularity(&gold, &DialogueIndex::new()).is_ok());
    }

    #[test]
    fn test_per_system_spearman() {
        let mut gold = ScoreIndices::default();
        let mut preds = ScoreIndices::default();
        for i in 0..3 {
            let value = i as f64;
            for system in ["barcor_redial", "kbrd_redial"] {
                let key = AnnotationKey::new(format!("{}_{}", system, i), 1);
                gold.turn.insert(key.clone(), turn_scores(&[(TurnAspect::Relevance, value)]));
                let predicted = if system == "barcor_redial" { value } else { -value };
                preds.turn.insert(key, turn_scores(&[(TurnAspect::Relevance, predicted)]));
            }
        }
        gold.dialogue.insert(
            "unicrs_opendialkg_1".to_string(),
            dial_scores(&[(DialogueAspect::Efficiency, 2.0)]),
        );
        preds.dialogue.insert("unicrs_opendialkg_1".to_string(), dial_scores(&[]));

        let systems = per_system_spearman(&gold, &preds).unwrap();
        let ids: Vec<_> = systems.iter().map(|s| s.system.as_str()).collect();
        assert_eq!(ids, vec!["barcor_redial", "kbrd_redial", "unicrs_opendialkg"]);

        assert!((systems[0].turn_level[&TurnAspect::Relevance] - 1.0).abs() < EPS);
        assert!((systems[1].turn_level[&TurnAspect::Relevance] + 1.0).abs() < EPS);
        assert!(systems[0].turn_level[&TurnAspect::Interestingness].is_nan());
        assert_eq!(systems[2].dialogue_level.len(), DialogueAspect::ALL.len());
        assert!(systems[2].dialogue_level.values().all(|rho| rho.is_nan()));
    }
}
