//! Before/after record of what the viral optimizer changed, kept for audit and feedback.

use chrono::{DateTime, Utc};

use crate::model::{OptimizationHistory, UnifiedContent, ViralAnalysis};

const SUMMARY_RECOMMENDATIONS: usize = 3;

/// Short human-readable summary from the score and the top recommendations.
pub fn change_summary(viral: &ViralAnalysis) -> String {
    let top: Vec<&str> = viral
        .recommendations
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .take(SUMMARY_RECOMMENDATIONS)
        .collect();
    if top.is_empty() {
        format!("Viral score {:.0}/100.", viral.score)
    } else {
        format!(
            "Viral score {:.0}/100. Top recommendations: {}.",
            viral.score,
            top.join("; ")
        )
    }
}

pub fn build_history(
    run_id: &str,
    content: &UnifiedContent,
    viral: &ViralAnalysis,
    now: DateTime<Utc>,
) -> OptimizationHistory {
    OptimizationHistory {
        run_id: run_id.to_string(),
        content_id: content.id.clone(),
        original_title: content.title.clone(),
        original_description: content.description.clone(),
        original_tags: content.tags.clone(),
        optimized_title: viral.optimized_title.clone(),
        optimized_description: viral.optimized_description.clone(),
        optimized_tags: viral.optimized_tags.clone(),
        change_summary: change_summary(viral),
        improvement_score: viral.score,
        created_at: now,
    }
}
