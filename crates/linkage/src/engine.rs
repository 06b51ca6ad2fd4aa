use log::{debug, info, warn};

use crate::blocking::block;
use crate::compare::{compute_features, score_distribution};
use crate::config::{LinkConfig, Pass};
use crate::error::LinkError;
use crate::model::{LinkMeta, LinkResult, Match, PassSummary, RecordSet, ScoreDistribution};
use crate::pool::MatchPool;
use crate::select::{augment, best_matches, plausible};
use crate::vocabulary::Vocabulary;

/// What one pass produced before the pool sees it.
#[derive(Debug, Clone)]
pub struct PassOutcome {
    pub candidates: usize,
    pub score_distribution: ScoreDistribution,
    pub plausible: usize,
    pub matches: Vec<Match>,
}

/// Block, compare, filter and select for one pass. Reads `left` only; the
/// caller applies the matches to its pool.
pub fn run_pass(pass: &Pass, left: &RecordSet, right: &RecordSet) -> Result<PassOutcome, LinkError> {
    debug!(
        "pass '{}': block on {:?} / {:?}, {} rule(s), min evidence {}, ties {:?}",
        pass.name,
        pass.block.left,
        pass.block.right,
        pass.rules.len(),
        pass.min_evidence_score,
        pass.tie_policy
    );

    let pairs = block(left, right, &pass.block)?;
    let features = compute_features(&pairs, left, right, &pass.rules)?;
    let candidates = plausible(&features, &pass.rules, pass.min_evidence_score)?;
    let best = best_matches(&candidates, pass.tie_policy);
    info!("Num. of best matches by name: {}", best.len());

    let matches = augment(&best, left, right, &pass.report, &pass.name)?;
    if matches.is_empty() {
        warn!("pass '{}' produced no matches", pass.name);
    }

    Ok(PassOutcome {
        candidates: pairs.len(),
        score_distribution: score_distribution(&features),
        plausible: candidates.len(),
        matches,
    })
}

/// Run `passes` in order against the pool. Each pass sees only the records
/// left unmatched by the passes before it.
pub fn run_passes(
    passes: &[Pass],
    pool: &mut MatchPool,
    right: &RecordSet,
) -> Result<Vec<PassSummary>, LinkError> {
    let mut summaries = Vec::with_capacity(passes.len());
    for pass in passes {
        let pool_before = pool.unmatched().len();
        info!("pass '{}': {} unmatched left record(s)", pass.name, pool_before);

        let outcome = run_pass(pass, pool.unmatched(), right)?;
        let best = outcome.matches.len();
        let accounting = pool.process_matched(outcome.matches)?;

        summaries.push(PassSummary {
            name: pass.name.clone(),
            pool_before,
            candidates: outcome.candidates,
            score_distribution: outcome.score_distribution,
            plausible: outcome.plausible,
            best_matches: best,
            accounting,
        });
    }
    Ok(summaries)
}

/// Derive dictionary-cleaned name columns where the config asks for them.
pub fn prepare(
    config: &LinkConfig,
    left: &mut RecordSet,
    right: &mut RecordSet,
    vocabulary: Option<&Vocabulary>,
) -> Result<(), LinkError> {
    for (source, set) in [(&config.left, left), (&config.right, right)] {
        let Some(dc) = &source.dict_clean else {
            continue;
        };
        let vocabulary = vocabulary.ok_or_else(|| {
            LinkError::ConfigValidation(format!(
                "{} table: dict_clean needs a vocabulary",
                set.side
            ))
        })?;
        set.derive_dict_clean(&dc.from, &dc.into, vocabulary)?;
    }
    Ok(())
}

/// Run every configured pass over `left` and `right`.
pub fn run(config: &LinkConfig, left: RecordSet, right: &RecordSet) -> Result<LinkResult, LinkError> {
    let passes = config.compile_passes()?;
    let left_records = left.len();

    let mut pool = MatchPool::new(left, config.left.count_column.clone())?;
    let summaries = run_passes(&passes, &mut pool, right)?;
    let accounting = pool.accounting();
    let (matches, unmatched) = pool.into_parts();

    Ok(LinkResult {
        meta: LinkMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            left_records,
            right_records: right.len(),
        },
        passes: summaries,
        accounting,
        matches,
        unmatched_ids: unmatched.ids().map(str::to_string).collect(),
    })
}
