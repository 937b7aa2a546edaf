//! Canned-reply rule table.
//!
//! Rules are evaluated top to bottom against the lower-cased utterance and the
//! first match wins, so the order of [`KeywordResponder::default`] is part of
//! its behavior. The current step travels with the input but does not take
//! part in dispatch.

use std::sync::OnceLock;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use tokenize_core::markup::{encode_card, encode_choices, encode_documents, ChoiceSpec, DocumentSpec};
use tokenize_core::{CardFields, CardKind, DocumentStatus, FieldValue, MarkupError, TurnInput};
use tracing::debug;

use crate::llm::ResponseGenerator;

pub const DEFAULT_COMPANY: &str = "TechCorp";
pub const DEFAULT_SHARE_COUNT: u64 = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResponseRule {
    AssetShares,
    CompanyDetails,
    LiquidityGoals,
    LegalStructure,
    TokenDesign,
    RealEstate,
    Deployment,
    Fallback,
}

impl ResponseRule {
    pub fn key(&self) -> &'static str {
        match self {
            Self::AssetShares => "asset_shares",
            Self::CompanyDetails => "company_details",
            Self::LiquidityGoals => "liquidity_goals",
            Self::LegalStructure => "legal_structure",
            Self::TokenDesign => "token_design",
            Self::RealEstate => "real_estate",
            Self::Deployment => "deployment",
            Self::Fallback => "fallback",
        }
    }
}

fn share_count_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d+).*shares?").expect("share count pattern is valid"))
}

fn company_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b[A-Z][a-zA-Z]+\b").expect("company name pattern is valid"))
}

/// Capitalized words that open ordinary sentences and never name a company.
const NON_COMPANY_WORDS: &[&str] = &[
    "a", "about", "actually", "also", "an", "and", "are", "as", "at", "but", "can", "could", "do",
    "for", "from", "hello", "hey", "hi", "honestly", "how", "i'm", "if", "in", "is", "it", "its",
    "just", "let", "me", "mine", "my", "no", "not", "of", "ok", "okay", "on", "or", "our", "please",
    "so", "thanks", "that", "the", "their", "there", "these", "they", "this", "those", "we", "well",
    "what", "when", "where", "which", "who", "why", "will", "with", "would", "yes", "you", "your",
];

fn is_company_candidate(word: &str) -> bool {
    let lowered = word.to_ascii_lowercase();
    !NON_COMPANY_WORDS.contains(&lowered.as_str())
}

/// Values pulled out of an utterance. `None` means the pattern did not match
/// and the caller decides what to substitute.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompanyDetails {
    pub company: Option<String>,
    pub shares: Option<u64>,
}

impl CompanyDetails {
    pub fn extract(input: &TurnInput) -> Self {
        let shares = share_count_pattern()
            .captures(&input.normalized_text())
            .and_then(|captures| captures.get(1))
            .and_then(|digits| digits.as_str().parse::<u64>().ok());
        let company = company_name_pattern()
            .find_iter(input.text())
            .map(|found| found.as_str())
            .find(|word| is_company_candidate(word))
            .map(str::to_string);

        Self { company, shares }
    }

    pub fn company_or_default(&self) -> &str {
        self.company.as_deref().unwrap_or(DEFAULT_COMPANY)
    }

    pub fn shares_or_default(&self) -> u64 {
        self.shares.unwrap_or(DEFAULT_SHARE_COUNT)
    }
}

type TemplateFn = fn(&TurnInput) -> Result<String, MarkupError>;

#[derive(Clone)]
struct Rule {
    id: ResponseRule,
    keywords: &'static [&'static str],
    pattern: Option<fn() -> &'static Regex>,
    template: TemplateFn,
}

impl Rule {
    fn matches(&self, normalized_text: &str) -> bool {
        self.keywords.iter().any(|keyword| normalized_text.contains(keyword))
            || self.pattern.is_some_and(|pattern| pattern().is_match(normalized_text))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleMatch {
    pub rule: ResponseRule,
    pub raw: String,
}

#[derive(Clone)]
pub struct KeywordResponder {
    rules: Vec<Rule>,
    simulated_latency: Duration,
}

impl Default for KeywordResponder {
    fn default() -> Self {
        let rules = vec![
            Rule {
                id: ResponseRule::AssetShares,
                keywords: &["shares", "stock", "equity"],
                pattern: None,
                template: asset_shares_reply,
            },
            Rule {
                id: ResponseRule::CompanyDetails,
                keywords: &["techcorp", "startup"],
                pattern: Some(share_count_pattern),
                template: company_details_reply,
            },
            Rule {
                id: ResponseRule::LiquidityGoals,
                keywords: &["cash", "money", "liquidity"],
                pattern: None,
                template: liquidity_goals_reply,
            },
            Rule {
                id: ResponseRule::LegalStructure,
                keywords: &["legal", "structure", "compliant"],
                pattern: None,
                template: legal_structure_reply,
            },
            Rule {
                id: ResponseRule::TokenDesign,
                keywords: &["token", "how many", "design"],
                pattern: None,
                template: token_design_reply,
            },
            Rule {
                id: ResponseRule::RealEstate,
                keywords: &["real estate", "property", "house"],
                pattern: None,
                template: real_estate_reply,
            },
            Rule {
                id: ResponseRule::Deployment,
                keywords: &["deploy", "launch", "ready"],
                pattern: None,
                template: deployment_reply,
            },
        ];

        Self { rules, simulated_latency: Duration::ZERO }
    }
}

impl KeywordResponder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_simulated_latency(mut self, latency: Duration) -> Self {
        self.simulated_latency = latency;
        self
    }

    pub fn simulated_latency(&self) -> Duration {
        self.simulated_latency
    }

    /// Rules in evaluation order, fallback last.
    pub fn rule_order(&self) -> Vec<ResponseRule> {
        self.rules.iter().map(|rule| rule.id).chain([ResponseRule::Fallback]).collect()
    }

    pub fn select(&self, input: &TurnInput) -> ResponseRule {
        self.matching_rule(input).map(|rule| rule.id).unwrap_or(ResponseRule::Fallback)
    }

    pub fn respond(&self, input: &TurnInput) -> Result<RuleMatch, MarkupError> {
        let (rule, template) = match self.matching_rule(input) {
            Some(rule) => (rule.id, rule.template),
            None => (ResponseRule::Fallback, fallback_reply as TemplateFn),
        };

        let raw = template(input)?;
        debug!(
            event_name = "agent.responder.rule_selected",
            rule = rule.key(),
            current_step = input.current_step(),
            "keyword rule selected"
        );
        Ok(RuleMatch { rule, raw })
    }

    fn matching_rule(&self, input: &TurnInput) -> Option<&Rule> {
        let normalized_text = input.normalized_text();
        self.rules.iter().find(|rule| rule.matches(&normalized_text))
    }
}

#[async_trait]
impl ResponseGenerator for KeywordResponder {
    async fn generate(&self, input: &TurnInput) -> Result<String> {
        if !self.simulated_latency.is_zero() {
            tokio::time::sleep(self.simulated_latency).await;
        }
        Ok(self.respond(input)?.raw)
    }
}

fn card_fields<const N: usize>(entries: [(&str, FieldValue); N]) -> CardFields {
    entries.into_iter().map(|(key, value)| (key.to_string(), value)).collect()
}

fn asset_shares_reply(_input: &TurnInput) -> Result<String, MarkupError> {
    let choices = encode_choices(&[
        ChoiceSpec::new("Private startup shares", "startup_shares").icon("🚀"),
        ChoiceSpec::new("Employee stock options", "stock_options").icon("💼"),
        ChoiceSpec::new("Public company shares", "public_shares").icon("📈"),
    ])?;

    Ok(format!(
        "I see you have company shares you'd like to tokenize. Let me gather some details to help you unlock that liquidity.\n\n\
         What's the company name and approximately how many shares do you own?\n\n\
         {choices}"
    ))
}

fn company_details_reply(input: &TurnInput) -> Result<String, MarkupError> {
    let details = CompanyDetails::extract(input);
    let company = details.company_or_default();

    let card = encode_card(
        CardKind::Asset,
        "Asset Details",
        &card_fields([
            ("company", FieldValue::from(company)),
            ("shares", FieldValue::from(details.shares_or_default())),
            ("assetType", FieldValue::from("Private Company Stock")),
            ("estimatedValue", FieldValue::from("~$50,000")),
        ]),
    )?;
    let choices = encode_choices(&[
        ChoiceSpec::new("Need cash for major purchase", "cash_need").icon("💰"),
        ChoiceSpec::new("Want trading flexibility", "trading_flexibility").icon("🔄"),
        ChoiceSpec::new("Diversification strategy", "diversification").icon("📊"),
    ])?;

    Ok(format!(
        "Perfect! I've recorded your {company} shares. Now let's understand your liquidity goals better.\n\n\
         {card}\n\n\
         How much of your stake would you like to convert to liquid tokens, and what's driving this need?\n\n\
         {choices}"
    ))
}

fn liquidity_goals_reply(_input: &TurnInput) -> Result<String, MarkupError> {
    let card = encode_card(
        CardKind::Liquidity,
        "Liquidity Goals",
        &card_fields([
            ("purpose", FieldValue::from("Cash for major purchase")),
            ("timeline", FieldValue::from("Next 3-6 months")),
            ("keepUpside", FieldValue::from("Yes")),
            ("suggestedSplit", FieldValue::from("40% sell, 60% keep")),
        ]),
    )?;

    Ok(format!(
        "Great! I understand you need some liquidity. Let me help you design the optimal token structure.\n\n\
         {card}\n\n\
         Typically, I recommend tokenizing your entire stake but only selling the portion you need now. \
         This preserves your upside while giving you immediate liquidity.\n\n\
         Would you like me to show you how the tokenization process works?"
    ))
}

fn legal_structure_reply(_input: &TurnInput) -> Result<String, MarkupError> {
    let card = encode_card(
        CardKind::Legal,
        "Legal Structure",
        &card_fields([
            ("entityType", FieldValue::from("Delaware LLC")),
            ("tokenStandard", FieldValue::from("ERC-20")),
            ("exemption", FieldValue::from("Rule 506(b)")),
            ("jurisdiction", FieldValue::from("United States")),
        ]),
    )?;

    Ok(format!(
        "Excellent question! For your situation, I recommend creating a Delaware LLC that holds your shares, \
         then issuing tokens representing LLC membership interests.\n\n\
         {card}\n\n\
         This structure is:\n\
         ✅ Securities law compliant\n\
         ✅ Tax efficient\n\
         ✅ Easily tradeable\n\
         ✅ Familiar to investors\n\n\
         Ready to move forward with deployment?"
    ))
}

fn token_design_reply(_input: &TurnInput) -> Result<String, MarkupError> {
    let card = encode_card(
        CardKind::Token,
        "Token Design",
        &card_fields([
            ("totalSupply", FieldValue::from("1,000 tokens")),
            ("ratio", FieldValue::from("1 token = 1 share")),
            ("yourAllocation", FieldValue::from("600 tokens (60%)")),
            ("forSale", FieldValue::from("400 tokens (40%)")),
            ("features", FieldValue::from("Auto dividend distribution")),
        ]),
    )?;

    Ok(format!(
        "Let's design your token structure! I recommend:\n\n\
         {card}\n\n\
         🪙 1,000 tokens total = 100% of your shares\n\
         🪙 Each token = 1 share of your company\n\
         🪙 You keep 600 tokens, sell 400\n\
         🪙 Automatic dividend distribution\n\n\
         This gives you $20,000+ in liquidity while keeping 60% upside exposure."
    ))
}

fn real_estate_reply(_input: &TurnInput) -> Result<String, MarkupError> {
    let choices = encode_choices(&[
        ChoiceSpec::new("Rental property I own", "rental_property").icon("🏠"),
        ChoiceSpec::new("Commercial real estate", "commercial_property").icon("🏢"),
        ChoiceSpec::new("Real estate partnership", "re_partnership").icon("🤝"),
    ])?;

    Ok(format!(
        "Real estate tokenization is a great use case! I can help you tokenize your property ownership stake \
         to create liquidity without selling the entire property.\n\n\
         What type of real estate are we working with?\n\n\
         {choices}"
    ))
}

fn deployment_reply(_input: &TurnInput) -> Result<String, MarkupError> {
    let documents = encode_documents(&[
        DocumentSpec::new("Token Holder Agreement", "PDF", "2.1 MB", DocumentStatus::Ready),
        DocumentSpec::new("LLC Operating Agreement", "PDF", "1.8 MB", DocumentStatus::Draft),
    ])?;
    let choices = encode_choices(&[
        // Commas split choice entries, so "Yes, let's deploy!" cannot be a label.
        ChoiceSpec::new("Let's deploy!", "deploy_confirm").icon("🚀"),
        ChoiceSpec::new("Review documents first", "review_docs").icon("📄"),
    ])?;

    Ok(format!(
        "Perfect! I'm ready to deploy your tokenization infrastructure. Here's what happens next:\n\n\
         📋 Generate legal documents (5 minutes)\n\
         🏗️ Create Delaware LLC (24 hours)\n\
         ⛓️ Deploy smart contracts (10 minutes)\n\
         🪙 Mint your tokens (5 minutes)\n\
         📈 Set up trading infrastructure (30 minutes)\n\n\
         Total setup time: ~48 hours\n\
         Setup cost: $2,500\n\n\
         Ready to proceed?\n\n\
         {documents}\n\
         {choices}"
    ))
}

fn fallback_reply(_input: &TurnInput) -> Result<String, MarkupError> {
    let choices = encode_choices(&[
        ChoiceSpec::new("Company shares", "company_shares").icon("📈"),
        ChoiceSpec::new("Real estate", "real_estate").icon("🏠"),
        ChoiceSpec::new("Business partnership", "partnership").icon("🤝"),
        ChoiceSpec::new("Other assets", "other").icon("💼"),
    ])?;

    Ok(format!(
        "I'd be happy to help you tokenize your assets! Could you tell me more about what you own \
         that you'd like to make more liquid?\n\n\
         I specialize in tokenizing:\n\
         • Company shares and stock options\n\
         • Real estate ownership stakes\n\
         • Business partnership interests\n\
         • Revenue-generating assets\n\n\
         What type of asset are you looking to tokenize?\n\n\
         {choices}"
    ))
}
