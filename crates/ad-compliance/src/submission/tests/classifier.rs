use crate::submission::classifier::{
    ImageAdvisory, RawAnalysis, ResultClassifier, ScoreTier, TokenUsage,
};

fn raw(relevancy: f64, image: Option<f64>, compliant: bool) -> RawAnalysis {
    RawAnalysis {
        relevancy_score: relevancy,
        image_score: image,
        compliant,
        issues: Vec::new(),
        suggestions: Vec::new(),
        cost_usd: None,
        tokens: None,
    }
}

#[test]
fn image_advisory_boundaries() {
    let classifier = ResultClassifier;
    let advisory = |score| classifier.classify(raw(90.0, Some(score), true)).image_advisory();

    assert_eq!(advisory(39.0), Some(ImageAdvisory::NotCompliant));
    assert_eq!(advisory(40.0), Some(ImageAdvisory::RelevanceWarning));
    assert_eq!(advisory(49.0), Some(ImageAdvisory::RelevanceWarning));
    assert_eq!(advisory(50.0), None);
    assert_eq!(
        ImageAdvisory::NotCompliant.label(),
        "Image Not Compliant"
    );
    assert_eq!(
        ImageAdvisory::RelevanceWarning.label(),
        "Image Relevance Warning"
    );
}

#[test]
fn tier_boundaries_fall_into_the_lower_band() {
    assert_eq!(ScoreTier::from_score(100.0), ScoreTier::Compliant);
    assert_eq!(ScoreTier::from_score(75.5), ScoreTier::Compliant);
    assert_eq!(ScoreTier::from_score(75.0), ScoreTier::Warning);
    assert_eq!(ScoreTier::from_score(41.0), ScoreTier::Warning);
    assert_eq!(ScoreTier::from_score(40.0), ScoreTier::NonCompliant);
    assert_eq!(ScoreTier::from_score(0.0), ScoreTier::NonCompliant);
}

#[test]
fn compliance_flag_is_not_reconciled_with_scores() {
    let result = ResultClassifier.classify(raw(97.0, Some(95.0), false));

    assert_eq!(result.relevancy_tier(), ScoreTier::Compliant);
    assert!(!result.compliant);
    assert_eq!(result.report().verdict, "Not Compliant");

    let lenient = ResultClassifier.classify(raw(12.0, None, true));
    assert_eq!(lenient.relevancy_tier(), ScoreTier::NonCompliant);
    assert_eq!(lenient.report().verdict, "Compliant");
}

#[test]
fn absent_optional_fields_stay_absent() {
    let body = r#"{"relevancy_score": 66, "compliant": true}"#;
    let parsed: RawAnalysis = serde_json::from_str(body).expect("minimal body parses");
    let result = ResultClassifier.classify(parsed);

    assert_eq!(result.image_score, None);
    assert_eq!(result.image_tier(), None);
    assert_eq!(result.image_advisory(), None);
    assert_eq!(result.cost_usd, None);
    assert_eq!(result.tokens, None);
    assert!(result.issues.is_empty());

    let report = result.report();
    assert_eq!(report.image.value, 0.0);
    assert_eq!(report.image_advisory, None);
    assert_eq!(report.cost, None);
    assert_eq!(report.relevancy.tier, ScoreTier::Warning);
}

#[test]
fn report_includes_cost_and_tokens_when_present() {
    let body = r#"{
        "relevancy_score": 81.5,
        "image_score": 44,
        "compliant": true,
        "issues": ["Claims 'guaranteed' results"],
        "suggestions": ["Cite the article's pricing section"],
        "cost_usd": 0.0042,
        "tokens": {"prompt": 812, "completion": 164, "total": 976}
    }"#;
    let parsed: RawAnalysis = serde_json::from_str(body).expect("full body parses");
    let report = ResultClassifier.classify(parsed).report();

    assert_eq!(report.relevancy.tier, ScoreTier::Compliant);
    assert_eq!(report.image.tier, ScoreTier::Warning);
    assert_eq!(report.image_advisory, Some("Image Relevance Warning"));
    assert_eq!(report.issues, vec!["Claims 'guaranteed' results"]);
    let cost = report.cost.expect("cost line present");
    assert_eq!(cost.cost_usd, 0.0042);
    assert_eq!(
        cost.tokens,
        Some(TokenUsage {
            prompt: 812,
            completion: 164,
            total: 976
        })
    );
}

#[test]
fn required_fields_must_be_present() {
    let missing_score = r#"{"compliant": true, "issues": []}"#;
    assert!(serde_json::from_str::<RawAnalysis>(missing_score).is_err());

    let missing_verdict = r#"{"relevancy_score": 70}"#;
    assert!(serde_json::from_str::<RawAnalysis>(missing_verdict).is_err());
}

#[test]
fn null_lists_are_read_as_empty() {
    let body = r#"{"relevancy_score": 80, "compliant": true, "issues": null, "suggestions": null}"#;
    let parsed: RawAnalysis = serde_json::from_str(body).expect("null lists parse");

    let report = ResultClassifier.classify(parsed).report();
    assert!(report.issues.is_empty());
    assert!(report.suggestions.is_empty());
    assert_eq!(report.verdict, "Compliant");
    assert_eq!(report.relevancy.tier, ScoreTier::Compliant);
}

#[test]
fn out_of_range_scores_are_clamped() {
    let result = ResultClassifier.classify(raw(130.0, Some(-4.0), true));
    assert_eq!(result.relevancy_score, 100.0);
    assert_eq!(result.image_score, Some(0.0));
    assert_eq!(result.image_advisory(), Some(ImageAdvisory::NotCompliant));
}
