//! Read-only projections over the synchronized collections.
//!
//! Everything here is recomputed from scratch on each call.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::crm::{Company, Contact, CrmActivity, PipelineDeal, PipelineStage, StageColor};
use crate::opportunities::Opportunity;

/// Merge two opportunity lists by id. A later duplicate replaces the earlier
/// record in place, so first-seen order is kept.
pub fn merge_opportunities(first: &[Opportunity], second: &[Opportunity]) -> Vec<Opportunity> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut merged: Vec<Opportunity> = Vec::with_capacity(first.len() + second.len());
    for opportunity in first.iter().chain(second.iter()) {
        match index.get(opportunity.id.as_str()) {
            Some(&position) => merged[position] = opportunity.clone(),
            None => {
                index.insert(opportunity.id.as_str(), merged.len());
                merged.push(opportunity.clone());
            }
        }
    }
    merged
}

pub fn activities_for_contact(activities: &[CrmActivity], contact_id: &str) -> Vec<CrmActivity> {
    activities
        .iter()
        .filter(|a| a.contact_id == contact_id)
        .cloned()
        .collect()
}

pub fn deals_for_contact(deals: &[PipelineDeal], contact_id: &str) -> Vec<PipelineDeal> {
    deals
        .iter()
        .filter(|d| d.contact_id == contact_id)
        .cloned()
        .collect()
}

pub fn activities_for_deal(activities: &[CrmActivity], deal_id: &str) -> Vec<CrmActivity> {
    activities
        .iter()
        .filter(|a| a.deal_id.as_deref() == Some(deal_id))
        .cloned()
        .collect()
}

/// The contact's linked opportunity ids resolved against `opportunities`.
/// Ids that do not resolve are skipped.
pub fn linked_opportunities(contact: &Contact, opportunities: &[Opportunity]) -> Vec<Opportunity> {
    contact
        .linked_opportunity_ids
        .iter()
        .filter_map(|id| opportunities.iter().find(|o| &o.id == id).cloned())
        .collect()
}

pub fn company_for_contact<'a>(contact: &Contact, companies: &'a [Company]) -> Option<&'a Company> {
    let company_id = contact.company_id.as_deref()?;
    companies.iter().find(|c| c.id == company_id)
}

pub fn contacts_for_company(contacts: &[Contact], company_id: &str) -> Vec<Contact> {
    contacts
        .iter()
        .filter(|c| c.company_id.as_deref() == Some(company_id))
        .cloned()
        .collect()
}

/// Deals grouped under each existing stage, in stage order. Deals pointing at
/// a missing stage are left out.
pub fn deals_by_stage(
    stages: &[PipelineStage],
    deals: &[PipelineDeal],
) -> Vec<(String, Vec<PipelineDeal>)> {
    stages
        .iter()
        .map(|stage| {
            let in_stage = deals
                .iter()
                .filter(|d| d.stage_id == stage.id)
                .cloned()
                .collect();
            (stage.id.clone(), in_stage)
        })
        .collect()
}

pub fn deal_count_by_stage(stages: &[PipelineStage], deals: &[PipelineDeal]) -> HashMap<String, usize> {
    stages
        .iter()
        .map(|stage| {
            let count = deals.iter().filter(|d| d.stage_id == stage.id).count();
            (stage.id.clone(), count)
        })
        .collect()
}

/// Stage name, or an empty string for a dangling id.
pub fn stage_name<'a>(stages: &'a [PipelineStage], stage_id: &str) -> &'a str {
    stages
        .iter()
        .find(|s| s.id == stage_id)
        .map(|s| s.name.as_str())
        .unwrap_or("")
}

/// Numeric reading of a display value such as "£250,000".
///
/// Everything but digits and dots is dropped; reading stops at a second dot.
/// Anything that does not parse counts as zero.
pub fn parse_display_value(value: &str) -> Decimal {
    let mut cleaned = String::with_capacity(value.len());
    let mut seen_dot = false;
    for ch in value.chars() {
        if ch.is_ascii_digit() {
            cleaned.push(ch);
        } else if ch == '.' {
            if seen_dot {
                break;
            }
            seen_dot = true;
            cleaned.push(ch);
        }
    }
    let cleaned = cleaned.trim_end_matches('.');
    if cleaned.is_empty() {
        return Decimal::ZERO;
    }
    let cleaned = if cleaned.starts_with('.') {
        format!("0{}", cleaned)
    } else {
        cleaned.to_string()
    };
    Decimal::from_str(&cleaned).unwrap_or(Decimal::ZERO)
}

/// Sum of the display values of the deals in one stage.
pub fn stage_value_total(deals: &[PipelineDeal], stage_id: &str) -> Decimal {
    deals
        .iter()
        .filter(|d| d.stage_id == stage_id)
        .map(|d| parse_display_value(&d.value))
        .sum()
}

/// Total with thousands separators and at most three decimals; `None` for zero.
pub fn format_stage_value(total: Decimal) -> Option<String> {
    let rounded = total.round_dp(3).normalize();
    if rounded.is_zero() {
        return None;
    }
    let text = rounded.abs().to_string();
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole.to_string(), Some(fraction.to_string())),
        None => (text.clone(), None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded.is_sign_negative() {
        grouped.insert(0, '-');
    }
    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(&fraction);
    }
    Some(grouped)
}

/// One pipeline column as presented on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    pub stage_id: String,
    pub name: String,
    pub color: StageColor,
    pub position: i32,
    pub deal_count: usize,
    pub value_label: Option<String>,
}

pub fn pipeline_summary(stages: &[PipelineStage], deals: &[PipelineDeal]) -> Vec<PipelineSummary> {
    stages
        .iter()
        .map(|stage| PipelineSummary {
            stage_id: stage.id.clone(),
            name: stage.name.clone(),
            color: stage.color,
            position: stage.position,
            deal_count: deals.iter().filter(|d| d.stage_id == stage.id).count(),
            value_label: format_stage_value(stage_value_total(deals, &stage.id)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opportunities::ConstructionStage;
    use rust_decimal_macros::dec;

    fn opportunity(id: &str, title: &str) -> Opportunity {
        Opportunity {
            id: id.to_string(),
            title: title.to_string(),
            location: "York".to_string(),
            description: String::new(),
            estimated_value: None,
            stage: ConstructionStage::Planning,
            source: "Gemini Search".to_string(),
            url: None,
            timestamp: "2026-03-01T09:30:00.000Z".to_string(),
            coordinates: None,
        }
    }

    fn deal(id: &str, stage_id: &str, value: &str) -> PipelineDeal {
        PipelineDeal {
            id: id.to_string(),
            title: format!("Deal {}", id),
            value: value.to_string(),
            contact_id: "c-1".to_string(),
            company_id: None,
            stage_id: stage_id.to_string(),
            opportunity_id: None,
            probability: 50,
            expected_close_date: String::new(),
            notes: String::new(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn stage(id: &str, name: &str, position: i32) -> PipelineStage {
        PipelineStage {
            id: id.to_string(),
            name: name.to_string(),
            color: StageColor::Blue,
            position,
            created_at: String::new(),
        }
    }

    #[test]
    fn merge_dedupes_with_last_write_winning() {
        let a = vec![opportunity("1", "one"), opportunity("2", "two")];
        let b = vec![opportunity("2", "two (saved)"), opportunity("3", "three")];
        let merged = merge_opportunities(&a, &b);
        let ids: Vec<&str> = merged.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(merged[1].title, "two (saved)");
    }

    #[test]
    fn merge_is_idempotent() {
        let a = vec![opportunity("1", "one"), opportunity("2", "two")];
        assert_eq!(merge_opportunities(&a, &a), a);
    }

    #[test]
    fn stage_total_ignores_unparsable_values() {
        let deals = vec![
            deal("a", "s1", "£10,000"),
            deal("b", "s1", "abc"),
            deal("c", "s1", "5,000"),
            deal("d", "s2", "£1,000,000"),
        ];
        let total = stage_value_total(&deals, "s1");
        assert_eq!(total, dec!(15000));
        assert_eq!(format_stage_value(total).as_deref(), Some("15,000"));
    }

    #[test]
    fn zero_total_has_no_label() {
        let deals = vec![deal("a", "s1", "TBC")];
        assert_eq!(format_stage_value(stage_value_total(&deals, "s1")), None);
        assert_eq!(format_stage_value(Decimal::ZERO), None);
    }

    #[test]
    fn display_value_stops_at_second_dot() {
        assert_eq!(parse_display_value("1.2.3"), dec!(1.2));
        assert_eq!(parse_display_value("£2.5M"), dec!(2.5));
        assert_eq!(parse_display_value("."), Decimal::ZERO);
        assert_eq!(format_stage_value(dec!(1234567.5)).as_deref(), Some("1,234,567.5"));
    }

    #[test]
    fn deals_on_missing_stages_are_not_grouped() {
        let stages = vec![stage("s1", "Lead", 0), stage("s2", "Won", 1)];
        let deals = vec![deal("a", "s1", "1"), deal("b", "gone", "1"), deal("c", "s2", "1")];
        let grouped = deals_by_stage(&stages, &deals);
        let total: usize = grouped.iter().map(|(_, d)| d.len()).sum();
        assert_eq!(total, 2);
        assert_eq!(deal_count_by_stage(&stages, &deals)["s1"], 1);
        assert_eq!(stage_name(&stages, "gone"), "");
    }

    #[test]
    fn summary_reports_counts_and_labels() {
        let stages = vec![stage("s1", "Lead", 0), stage("s2", "Won", 1)];
        let deals = vec![deal("a", "s1", "£2,500"), deal("b", "s1", "£500")];
        let summary = pipeline_summary(&stages, &deals);
        assert_eq!(summary[0].deal_count, 2);
        assert_eq!(summary[0].value_label.as_deref(), Some("3,000"));
        assert_eq!(summary[1].value_label, None);
    }
}
