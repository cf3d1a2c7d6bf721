//! Report assembler: classifies every score and lays out the report content.
//!
//! The output is a renderer-independent [`ReportDocument`]. The PDF renderer
//! and [`ReportDocument::to_markdown`] both walk the same sections.

use chrono::{NaiveDate, Utc};
use serde::Serialize;

use crate::content::{self, Domain};
use crate::response::ParsedResponse;
use crate::scores::{RankedScore, ScoreError, ScoreKey, Stage};

const FILE_STEM_PREFIX: &str = "church_missions_readiness_report_";
const UNKNOWN_CHURCH: &str = "Unknown Church";

/// Per-report values that do not come from the response scores.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub report_date: NaiveDate,
}

impl ReportContext {
    /// Uses the submission date when known, today otherwise.
    pub fn for_response(response: &ParsedResponse) -> Self {
        let report_date = response
            .submitted_at
            .map(|ts| ts.date_naive())
            .unwrap_or_else(|| Utc::now().date_naive());
        Self { report_date }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubDomainScore {
    pub key: ScoreKey,
    pub raw: f64,
    pub percentage: f64,
    pub stage: Stage,
    pub summary_insight: &'static str,
    pub next_step: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct DomainScore {
    pub domain: Domain,
    pub raw: f64,
    pub percentage: f64,
    pub stage: Stage,
    pub insight: &'static str,
    pub sub_domains: Vec<SubDomainScore>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "domain", rename_all = "snake_case")]
pub enum SectionKind {
    Cover,
    ExecutiveSummary,
    DomainOverview,
    DomainBreakdown(Domain),
    Reflections,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Subheading {
        text: String,
    },
    Paragraph {
        text: String,
    },
    Bullets {
        items: Vec<String>,
    },
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    /// Radar chart of (axis label, percentage) points.
    RadarChart {
        points: Vec<(String, f64)>,
    },
    /// Blank lines for handwritten notes.
    NoteLines {
        count: usize,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub kind: SectionKind,
    pub title: String,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportDocument {
    /// File name without extension, derived from the church name.
    pub file_stem: String,
    pub church: String,
    pub overall_percentage: f64,
    pub overall_stage: Stage,
    pub domains: Vec<DomainScore>,
    pub sections: Vec<Section>,
}

impl ReportDocument {
    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    /// Markdown rendition of the whole report.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();

        for section in &self.sections {
            let level = if section.kind == SectionKind::Cover { "#" } else { "##" };
            out.push_str(&format!("{} {}\n\n", level, section.title));

            for block in &section.blocks {
                match block {
                    Block::Subheading { text } => out.push_str(&format!("### {}\n\n", text)),
                    Block::Paragraph { text } => out.push_str(&format!("{}\n\n", text)),
                    Block::Bullets { items } => {
                        for item in items {
                            out.push_str(&format!("- {}\n", item));
                        }
                        out.push('\n');
                    }
                    Block::Table { headers, rows } => {
                        out.push_str(&format!("| {} |\n", headers.join(" | ")));
                        let rule: Vec<&str> = headers.iter().map(|_| "---").collect();
                        out.push_str(&format!("| {} |\n", rule.join(" | ")));
                        for row in rows {
                            out.push_str(&format!("| {} |\n", row.join(" | ")));
                        }
                        out.push('\n');
                    }
                    Block::RadarChart { points } => {
                        let summary: Vec<String> = points
                            .iter()
                            .map(|(label, value)| format!("{} {}", label, format_percentage(*value)))
                            .collect();
                        out.push_str(&format!("_Domain radar chart: {}_\n\n", summary.join(", ")));
                    }
                    Block::NoteLines { count } => {
                        for _ in 0..*count {
                            out.push_str("____________________________________________\n\n");
                        }
                    }
                }
            }
        }

        out
    }
}

/// Two-decimal percentage, as shown throughout the report.
pub fn format_percentage(value: f64) -> String {
    format!("{:.2}%", value)
}

/// Deterministic file stem for a church's report.
pub fn report_file_stem(church: &str) -> String {
    let mut stem = String::with_capacity(FILE_STEM_PREFIX.len() + church.len());
    stem.push_str(FILE_STEM_PREFIX);

    let mut last_was_separator = true;
    for c in church.trim().chars().map(fold_latin1) {
        if c.is_ascii_alphanumeric() || c == '-' {
            stem.push(c);
            last_was_separator = false;
        } else if !last_was_separator {
            stem.push('_');
            last_was_separator = true;
        }
    }

    while stem.ends_with('_') && stem.len() > FILE_STEM_PREFIX.len() {
        stem.pop();
    }
    if stem.len() == FILE_STEM_PREFIX.len() {
        stem.push_str("Unknown_Church");
    }
    stem
}

/// Folds accented Latin-1 letters to their ASCII base letter.
fn fold_latin1(c: char) -> char {
    match c {
        '\u{00C0}'..='\u{00C5}' => 'A',
        '\u{00E0}'..='\u{00E5}' => 'a',
        '\u{00C7}' => 'C',
        '\u{00E7}' => 'c',
        '\u{00C8}'..='\u{00CB}' => 'E',
        '\u{00E8}'..='\u{00EB}' => 'e',
        '\u{00CC}'..='\u{00CF}' => 'I',
        '\u{00EC}'..='\u{00EF}' => 'i',
        '\u{00D1}' => 'N',
        '\u{00F1}' => 'n',
        '\u{00D2}'..='\u{00D6}' | '\u{00D8}' => 'O',
        '\u{00F2}'..='\u{00F6}' | '\u{00F8}' => 'o',
        '\u{00D9}'..='\u{00DC}' => 'U',
        '\u{00F9}'..='\u{00FC}' => 'u',
        '\u{00DD}' => 'Y',
        '\u{00FD}' | '\u{00FF}' => 'y',
        other => other,
    }
}

/// Scores every domain and sub-domain and lays out the report sections.
pub fn assemble(
    response: &ParsedResponse,
    context: &ReportContext,
) -> Result<ReportDocument, ScoreError> {
    let scores = &response.scores;

    let domains = Domain::ALL
        .iter()
        .map(|&domain| score_domain(response, domain))
        .collect::<Result<Vec<_>, _>>()?;

    let overall_percentage = match scores.finalpercentage {
        Some(value) => value,
        None => domains.iter().map(|d| d.percentage).sum::<f64>() / domains.len() as f64,
    };
    let overall_stage = Stage::classify(overall_percentage)?;

    let church = response
        .answers
        .church
        .clone()
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| UNKNOWN_CHURCH.to_string());

    let sections = vec![
        cover_section(response, &church, context),
        executive_summary_section(response, &domains, overall_percentage, overall_stage)?,
        overview_section(&domains),
    ]
    .into_iter()
    .chain(domains.iter().map(breakdown_section))
    .chain(std::iter::once(reflections_section()))
    .collect();

    tracing::debug!(
        "Assembled report for '{}': overall {} ({})",
        church,
        format_percentage(overall_percentage),
        overall_stage
    );

    Ok(ReportDocument {
        file_stem: report_file_stem(&church),
        church,
        overall_percentage,
        overall_stage,
        domains,
        sections,
    })
}

fn score_domain(response: &ParsedResponse, domain: Domain) -> Result<DomainScore, ScoreError> {
    let scores = &response.scores;
    let key = domain.score_key();
    let percentage = scores.percentage(key)?;
    let stage = Stage::classify(percentage)?;

    let sub_domains = domain
        .sub_domains()
        .iter()
        .map(|&sub| {
            let percentage = scores.percentage(sub)?;
            let stage = Stage::classify(percentage)?;
            let text = content::sub_domain_text(sub, stage).unwrap_or(content::StageText {
                summary_insight: "",
                next_step: "",
            });
            Ok(SubDomainScore {
                key: sub,
                raw: scores.get(sub),
                percentage,
                stage,
                summary_insight: text.summary_insight,
                next_step: text.next_step,
            })
        })
        .collect::<Result<Vec<_>, ScoreError>>()?;

    Ok(DomainScore {
        domain,
        raw: scores.get(key),
        percentage,
        stage,
        insight: content::domain_insight(domain, stage),
        sub_domains,
    })
}

fn cover_section(response: &ParsedResponse, church: &str, context: &ReportContext) -> Section {
    let answers = &response.answers;
    let respondent = answers.respondent.as_deref().unwrap_or("Anonymous");
    let completed_by = match answers.role.as_deref().filter(|r| !r.is_empty()) {
        Some(role) => format!("{} ({})", respondent, role),
        None => respondent.to_string(),
    };

    Section {
        kind: SectionKind::Cover,
        title: content::REPORT_TITLE.to_string(),
        blocks: vec![
            Block::Paragraph {
                text: format!("Prepared for: {}", church),
            },
            Block::Paragraph {
                text: format!("Completed by: {}", completed_by),
            },
            Block::Paragraph {
                text: format!("Date: {}", context.report_date.format("%-d %B %Y")),
            },
            Block::Paragraph {
                text: content::ASSESSMENT_NAME.to_string(),
            },
        ],
    }
}

fn highlight(entry: &RankedScore) -> Result<String, ScoreError> {
    let percentage = crate::scores::raw_to_percentage(entry.key, entry.value)?;
    let stage = Stage::classify(percentage)?;
    Ok(format!(
        "{}: {} ({})",
        entry.key.display_name(),
        format_percentage(percentage),
        stage
    ))
}

fn executive_summary_section(
    response: &ParsedResponse,
    domains: &[DomainScore],
    overall_percentage: f64,
    overall_stage: Stage,
) -> Result<Section, ScoreError> {
    let scores = &response.scores;
    let strongest = scores
        .top_3()
        .iter()
        .map(highlight)
        .collect::<Result<Vec<_>, _>>()?;
    let growth = scores
        .bottom_3()
        .iter()
        .map(highlight)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Section {
        kind: SectionKind::ExecutiveSummary,
        title: "Executive Summary".to_string(),
        blocks: vec![
            Block::Subheading {
                text: format!(
                    "Overall Readiness Score: {} ({})",
                    format_percentage(overall_percentage),
                    overall_stage
                ),
            },
            Block::Paragraph {
                text: content::EXECUTIVE_SUMMARY_INTRO.to_string(),
            },
            Block::RadarChart {
                points: domains
                    .iter()
                    .map(|d| (d.domain.display_name().to_string(), d.percentage))
                    .collect(),
            },
            Block::Subheading {
                text: "Top 3 Strongest Sub-domains".to_string(),
            },
            Block::Bullets { items: strongest },
            Block::Subheading {
                text: "3 Areas for Growth".to_string(),
            },
            Block::Bullets { items: growth },
        ],
    })
}

fn overview_section(domains: &[DomainScore]) -> Section {
    let rows = domains
        .iter()
        .map(|d| {
            vec![
                d.domain.display_name().to_string(),
                format_percentage(d.percentage),
                d.stage.to_string(),
                d.insight.to_string(),
            ]
        })
        .collect();

    Section {
        kind: SectionKind::DomainOverview,
        title: "Domain Overview".to_string(),
        blocks: vec![Block::Table {
            headers: vec![
                "Domain".to_string(),
                "Score".to_string(),
                "Stage".to_string(),
                "Summary Insight".to_string(),
            ],
            rows,
        }],
    }
}

fn breakdown_section(domain: &DomainScore) -> Section {
    let mut blocks = vec![
        Block::Paragraph {
            text: domain.domain.description().to_string(),
        },
        Block::Paragraph {
            text: format!(
                "Domain score: {} ({})",
                format_percentage(domain.percentage),
                domain.stage
            ),
        },
        Block::Paragraph {
            text: domain.insight.to_string(),
        },
    ];

    for sub in &domain.sub_domains {
        blocks.push(Block::Subheading {
            text: format!(
                "{}: {} ({})",
                sub.key.display_name(),
                format_percentage(sub.percentage),
                sub.stage
            ),
        });
        blocks.push(Block::Paragraph {
            text: sub.summary_insight.to_string(),
        });
        blocks.push(Block::Paragraph {
            text: format!("Next step: {}", sub.next_step),
        });
    }

    Section {
        kind: SectionKind::DomainBreakdown(domain.domain),
        title: format!("Domain Breakdown: {}", domain.domain.display_name()),
        blocks,
    }
}

fn reflections_section() -> Section {
    Section {
        kind: SectionKind::Reflections,
        title: "Reflections".to_string(),
        blocks: vec![
            Block::Bullets {
                items: content::REFLECTION_PROMPTS
                    .iter()
                    .map(|p| p.to_string())
                    .collect(),
            },
            Block::NoteLines { count: 6 },
            Block::Paragraph {
                text: content::CLOSING_NOTE.to_string(),
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::AnswerFields;
    use crate::scores::ScoreSet;

    fn response(values: [f64; 14], church: Option<&str>) -> ParsedResponse {
        ParsedResponse {
            response_id: None,
            submitted_at: None,
            answers: AnswerFields {
                respondent: Some("Jane Tan".to_string()),
                email: Some("jane@grace.sg".to_string()),
                role: Some("Elder".to_string()),
                church: church.map(str::to_string),
            },
            scores: ScoreSet::new(values, None, None),
        }
    }

    fn context() -> ReportContext {
        ReportContext {
            report_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        }
    }

    #[test]
    fn test_discipleship_twenty_is_eighty_percent_stage_four() {
        let mut values = [10.0; 14];
        values[0] = 20.0;
        let doc = assemble(&response(values, Some("Grace Church")), &context()).unwrap();

        let discipleship = &doc.domains[0];
        assert_eq!(discipleship.domain, Domain::Discipleship);
        assert_eq!(discipleship.percentage, 80.0);
        assert_eq!(discipleship.stage.value(), 4);
        assert_eq!(
            discipleship.insight,
            "Missions is actively taught and supported with structured equipping."
        );
        assert_eq!(discipleship.sub_domains.len(), 2);
        assert_eq!(discipleship.sub_domains[0].percentage, 40.0);
    }

    #[test]
    fn test_section_order() {
        let doc = assemble(&response([12.5; 14], Some("Grace Church")), &context()).unwrap();
        let kinds: Vec<SectionKind> = doc.sections.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SectionKind::Cover,
                SectionKind::ExecutiveSummary,
                SectionKind::DomainOverview,
                SectionKind::DomainBreakdown(Domain::Discipleship),
                SectionKind::DomainBreakdown(Domain::Sending),
                SectionKind::DomainBreakdown(Domain::Support),
                SectionKind::DomainBreakdown(Domain::Structure),
                SectionKind::Reflections,
            ]
        );
        // no finalpercentage: overall is the mean of the domain percentages
        assert_eq!(doc.overall_percentage, 50.0);
    }

    #[test]
    fn test_out_of_range_raw_score_is_rejected() {
        let mut values = [10.0; 14];
        values[7] = 30.0;
        let err = assemble(&response(values, Some("Grace")), &context()).unwrap_err();
        assert!(matches!(
            err,
            ScoreError::RawScoreOutOfRange { key: "praying", .. }
        ));
    }

    #[test]
    fn test_file_stem_from_church_name() {
        assert_eq!(
            report_file_stem("Grace Church"),
            "church_missions_readiness_report_Grace_Church"
        );
        assert_eq!(
            report_file_stem("  St. John's / Bukit-Timah  "),
            "church_missions_readiness_report_St_John_s_Bukit-Timah"
        );
        assert_eq!(
            report_file_stem("../"),
            "church_missions_readiness_report_Unknown_Church"
        );
        assert_eq!(
            report_file_stem("\u{00C9}glise de S\u{00E3}o Jo\u{00E3}o"),
            "church_missions_readiness_report_Eglise_de_Sao_Joao"
        );
    }

    #[test]
    fn test_missing_church_uses_placeholder() {
        let doc = assemble(&response([10.0; 14], None), &context()).unwrap();
        assert_eq!(doc.church, "Unknown Church");
        assert_eq!(doc.file_stem, "church_missions_readiness_report_Unknown_Church");
    }

    #[test]
    fn test_markdown_contains_cover_and_overview() {
        let doc = assemble(&response([10.0; 14], Some("Grace Church")), &context()).unwrap();
        let md = doc.to_markdown();
        assert!(md.starts_with("# Church Missions Readiness Report"));
        assert!(md.contains("Prepared for: Grace Church"));
        assert!(md.contains("Completed by: Jane Tan (Elder)"));
        assert!(md.contains("Date: 1 June 2025"));
        assert!(md.contains("| Discipleship | 40.00% | Stage 2 (Aware) |"));
    }
}
