//! Asset aggregation: gathers generated images and the original media per platform.

use crate::model::{GeneratedAssets, OptimizationResults, Platform};

/// Collects thumbnail and ad creative URLs and maps the original media reference onto every
/// target platform. Deterministic; performs no I/O.
pub fn aggregate_assets(
    results: &OptimizationResults,
    media_url: Option<&str>,
    platforms: &[Platform],
) -> GeneratedAssets {
    let thumbnails = results
        .thumbnail
        .iter()
        .map(|t| t.image_url.clone())
        .collect();
    let ad_creatives = results.ad.iter().map(|a| a.image_url.clone()).collect();
    let platform_media = match media_url {
        Some(url) => platforms
            .iter()
            .map(|p| (p.clone(), url.to_string()))
            .collect(),
        None => Default::default(),
    };

    GeneratedAssets {
        thumbnails,
        ad_creatives,
        platform_media,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GeneratedAd, GeneratedThumbnail};

    #[test]
    fn collects_generated_urls_and_propagates_media() {
        let results = OptimizationResults {
            viral: None,
            thumbnail: Some(GeneratedThumbnail {
                analysis_id: "t".into(),
                image_url: "https://img/t.png".into(),
                score: 80.0,
            }),
            ad: Some(GeneratedAd {
                analysis_id: "a".into(),
                image_url: "https://img/a.png".into(),
                headline: "h".into(),
                score: 50.0,
            }),
        };
        let assets = aggregate_assets(
            &results,
            Some("https://cdn/v.mp4"),
            &[Platform::YouTube, Platform::TikTok],
        );
        assert_eq!(assets.thumbnails, vec!["https://img/t.png".to_string()]);
        assert_eq!(assets.ad_creatives, vec!["https://img/a.png".to_string()]);
        assert_eq!(assets.platform_media.len(), 2);
        assert_eq!(
            assets.platform_media.get(&Platform::TikTok).map(String::as_str),
            Some("https://cdn/v.mp4")
        );
    }

    #[test]
    fn no_optimizers_and_no_media_yields_empty_assets() {
        let assets = aggregate_assets(&OptimizationResults::default(), None, &[Platform::YouTube]);
        assert_eq!(assets, GeneratedAssets::default());
    }
}
