use crate::infra::{build_engine_router, load_image, open_session};
use ad_compliance::config::AppConfig;
use ad_compliance::error::AppError;
use ad_compliance::submission::{
    AdImage, AnalysisRecord, Destination, DispatchOutcome, Engine, FieldArray, FormState,
    RewrittenAd, ScorePill, Selector,
};
use ad_compliance::telemetry;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct CheckArgs {
    /// Landing page URL the ad points at
    #[arg(long)]
    pub(crate) url: String,
    /// Headline text (repeat for multiple headlines, up to 10)
    #[arg(long = "headline")]
    pub(crate) headlines: Vec<String>,
    /// Description text (repeat for multiple descriptions, up to 10)
    #[arg(long = "description")]
    pub(crate) descriptions: Vec<String>,
    /// Primary ad copy
    #[arg(long, default_value = "")]
    pub(crate) primary_text: String,
    /// Optional image description / keywords
    #[arg(long)]
    pub(crate) keywords: Option<String>,
    /// Creative image to attach (repeatable)
    #[arg(long = "image")]
    pub(crate) images: Vec<PathBuf>,
    /// Analysis engine: fast, gpt, or gemini (defaults to fast)
    #[arg(long, conflicts_with = "destination")]
    pub(crate) engine: Option<Engine>,
    /// Destination network: adsense, facebook, google_ads, native, or performance
    #[arg(long)]
    pub(crate) destination: Option<Destination>,
    /// Operator email checked against ADCHECK_ALLOWED_EMAILS
    #[arg(long)]
    pub(crate) email: Option<String>,
    /// Also request rewritten copy after the analysis
    #[arg(long)]
    pub(crate) rewrite: bool,
}

/// Ad copy as supplied by an operator surface, before it becomes session form state.
#[derive(Debug, Default)]
pub(crate) struct AdDraft {
    pub(crate) url: String,
    pub(crate) headlines: Vec<String>,
    pub(crate) descriptions: Vec<String>,
    pub(crate) primary_text: String,
    pub(crate) keywords: Option<String>,
    pub(crate) images: Vec<AdImage>,
}

impl AdDraft {
    pub(crate) fn into_form(self) -> Result<FormState, AppError> {
        Ok(FormState {
            url: self.url,
            headlines: FieldArray::from_entries(self.headlines)?,
            descriptions: FieldArray::from_entries(self.descriptions)?,
            primary_text: self.primary_text,
            keywords: self.keywords.unwrap_or_default(),
            images: self.images,
        })
    }
}

pub(crate) fn selector_from(
    engine: Option<Engine>,
    destination: Option<Destination>,
) -> Result<Selector, AppError> {
    match (engine, destination) {
        (Some(_), Some(_)) => Err(AppError::BadRequest(
            "choose either an engine or a destination, not both".to_string(),
        )),
        (Some(engine), None) => Ok(engine.into()),
        (None, Some(destination)) => Ok(destination.into()),
        (None, None) => Ok(Selector::default()),
    }
}

pub(crate) async fn run_check(args: CheckArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let CheckArgs {
        url,
        headlines,
        descriptions,
        primary_text,
        keywords,
        images,
        engine,
        destination,
        email,
        rewrite,
    } = args;

    let selector = selector_from(engine, destination)?;
    let images = images
        .iter()
        .map(|path| load_image(path))
        .collect::<Result<Vec<_>, _>>()?;
    let form = AdDraft {
        url,
        headlines,
        descriptions,
        primary_text,
        keywords,
        images,
    }
    .into_form()?;

    let engines = Arc::new(build_engine_router(&config.engine)?);
    let session = open_session(engines, Arc::new(config.access.allow_list()), email).await?;
    session.edit_form(|current| *current = form);

    println!("Ad compliance check");
    println!("  Selector: {selector}");
    println!("  Access: {:?}", session.access_state());

    match session.submit(selector).await? {
        DispatchOutcome::Accepted(record) => render_record(&record),
        DispatchOutcome::Discarded { generation } => {
            println!("  Result from generation {generation} was discarded");
        }
    }

    if rewrite {
        match session.rewrite().await? {
            DispatchOutcome::Accepted(rewritten) => render_rewrite(&rewritten),
            DispatchOutcome::Discarded { generation } => {
                println!("  Rewrite from generation {generation} was discarded");
            }
        }
    }

    Ok(())
}

fn render_record(record: &AnalysisRecord) {
    let report = record.result.report();

    println!(
        "  Received: {}",
        record.received_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("  Verdict: {}", report.verdict);
    render_pill(&report.relevancy);
    render_pill(&report.image);
    if let Some(advisory) = report.image_advisory {
        println!("  ! {advisory}");
    }

    if report.issues.is_empty() {
        println!("  Issues: none");
    } else {
        println!("  Issues:");
        for issue in &report.issues {
            println!("    - {issue}");
        }
    }
    if !report.suggestions.is_empty() {
        println!("  Suggestions:");
        for suggestion in &report.suggestions {
            println!("    - {suggestion}");
        }
    }

    if let Some(cost) = &report.cost {
        match &cost.tokens {
            Some(tokens) => println!(
                "  Cost: ${:.4} ({} tokens: {} prompt / {} completion)",
                cost.cost_usd, tokens.total, tokens.prompt, tokens.completion
            ),
            None => println!("  Cost: ${:.4}", cost.cost_usd),
        }
    }
}

fn render_pill(pill: &ScorePill) {
    println!("  {}: {:.0} ({:?})", pill.label, pill.value, pill.tier);
}

fn render_rewrite(rewritten: &RewrittenAd) {
    println!("\nSuggested rewrite");
    if rewritten.is_empty() {
        println!("  Engine returned no rewritten copy");
        return;
    }
    if let Some(headline) = &rewritten.headline {
        println!("  Headline: {headline}");
    }
    if let Some(description) = &rewritten.description {
        println!("  Description: {description}");
    }
    if let Some(primary_text) = &rewritten.primary_text {
        println!("  Primary text: {primary_text}");
    }
    for (key, value) in &rewritten.extra {
        println!("  {key}: {value}");
    }
}
