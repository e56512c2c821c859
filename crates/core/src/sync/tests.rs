use std::collections::HashSet;
use std::sync::Arc;

use chrono::TimeZone;

use super::*;
use crate::campaigns::{CampaignStatus, EmailStep, NewCampaign};
use crate::crm::{
    ActivityType, ContactUpdate, CompanyUpdate, DealUpdate, NewCompany, NewContact, NewDeal,
    NewStage, PipelineStage, StageChanges, StageColor, StageEdit, StagePosition,
};
use crate::documents::{DocumentContent, EmailSequence, NewDocument, OnePager};
use crate::ids::{is_local_id, FixedClock, IdentityGenerator};
use crate::opportunities::{ConstructionStage, Opportunity};
use crate::store::{InMemoryGateway, RemoteStoreGateway};

const DEFAULT_NAMES: [&str; 6] = [
    "Lead",
    "Qualified",
    "Proposal Sent",
    "Negotiation",
    "Won",
    "Lost",
];

fn generator() -> Arc<IdentityGenerator> {
    let instant = chrono::Utc
        .with_ymd_and_hms(2026, 3, 1, 9, 30, 0)
        .unwrap();
    Arc::new(IdentityGenerator::with_clock(Arc::new(FixedClock(instant))))
}

fn remote() -> (Arc<InMemoryGateway>, SyncMode) {
    let gateway = Arc::new(InMemoryGateway::new());
    let mode = SyncMode::select(Some(gateway.clone() as Arc<dyn RemoteStoreGateway>));
    (gateway, mode)
}

fn unconfigured() -> (Arc<InMemoryGateway>, SyncMode) {
    let gateway = Arc::new(InMemoryGateway::unconfigured());
    let mode = SyncMode::select(Some(gateway.clone() as Arc<dyn RemoteStoreGateway>));
    (gateway, mode)
}

fn both_modes() -> Vec<(Arc<InMemoryGateway>, SyncMode)> {
    vec![unconfigured(), remote()]
}

fn contact(first: &str, last: &str) -> NewContact {
    NewContact {
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: format!("{}@example.co.uk", first.to_lowercase()),
        ..Default::default()
    }
}

fn deal(title: &str, contact_id: &str, stage_id: &str, value: &str) -> NewDeal {
    NewDeal {
        title: title.to_string(),
        value: value.to_string(),
        contact_id: contact_id.to_string(),
        stage_id: stage_id.to_string(),
        probability: 40,
        ..Default::default()
    }
}

fn opportunity(id: &str) -> Opportunity {
    Opportunity {
        id: id.to_string(),
        title: format!("Scheme {}", id),
        location: "Sheffield".to_string(),
        description: "Mixed-use block".to_string(),
        estimated_value: Some("£4M".to_string()),
        stage: ConstructionStage::Tender,
        source: "Gemini Search".to_string(),
        url: None,
        timestamp: "2026-03-01T09:30:00.000Z".to_string(),
        coordinates: None,
    }
}

fn stage_names(crm: &CrmSynchronizer) -> Vec<String> {
    crm.stages().iter().map(|s| s.name.clone()).collect()
}

fn stage_by_name<'a>(crm: &'a CrmSynchronizer, name: &str) -> &'a PipelineStage {
    crm.stages()
        .iter()
        .find(|s| s.name == name)
        .unwrap_or_else(|| panic!("stage {} missing", name))
}

/// Replace whatever pipeline exists with A, B, C at positions 0, 1, 2.
async fn abc_pipeline(crm: &mut CrmSynchronizer) {
    let existing: Vec<String> = crm.stages().iter().map(|s| s.id.clone()).collect();
    crm.apply_stage_changes(StageChanges {
        deleted: existing,
        updated: Vec::new(),
        created: ["A", "B", "C"]
            .iter()
            .enumerate()
            .map(|(i, name)| NewStage {
                name: name.to_string(),
                color: StageColor::Slate,
                position: i as i32,
            })
            .collect(),
    })
    .await;
}

// ─────────────────────────────────────────────────────────────────────────────
// Branch selection
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unconfigured_gateway_is_never_called() {
    let (gateway, mode) = unconfigured();
    assert!(!mode.is_remote());
    let ids = generator();

    let mut crm = CrmSynchronizer::new(mode.clone(), ids.clone());
    crm.load().await;
    let company = crm
        .create_company(NewCompany {
            name: "Northgate Developments".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let ada = crm.create_contact(contact("Ada", "Stone")).await.unwrap();
    crm.update_contact(&ada.id, ContactUpdate {
        company_id: Some(Some(company.id.clone())),
        ..Default::default()
    })
    .await
    .unwrap();
    crm.link_opportunities(&ada.id, vec!["real-1-0".to_string()]).await;
    crm.update_company(&company.id, CompanyUpdate {
        phone: Some("0113 000 0000".to_string()),
        ..Default::default()
    })
    .await
    .unwrap();
    let lead = stage_by_name(&crm, "Lead").id.clone();
    let won = stage_by_name(&crm, "Won").id.clone();
    let created = crm
        .create_deal(deal("Fit-out", &ada.id, &lead, "£20,000"))
        .await
        .unwrap();
    crm.update_deal(&created.id, DealUpdate {
        probability: Some(80),
        ..Default::default()
    })
    .await
    .unwrap();
    crm.move_deal(&created.id, &won).await;
    let note = crm
        .log_activity(&ada.id, ActivityType::Call, "Intro call", "")
        .await;
    crm.log_global_activity(ActivityType::Note, "Market note", "").await;
    crm.delete_activity(&note.id).await;
    crm.reorder_stages(vec![StagePosition {
        id: lead.clone(),
        position: 9,
    }])
    .await;
    crm.delete_deal(&created.id).await;
    crm.delete_company(&company.id).await;
    crm.delete_contact(&ada.id).await;

    let mut campaigns = CampaignSynchronizer::new(mode.clone(), ids.clone());
    campaigns.load().await;
    let campaign = campaigns
        .create_campaign(NewCampaign {
            name: "Spring outreach".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    campaigns
        .change_status(&campaign.id, CampaignStatus::Active)
        .await;
    campaigns.duplicate_campaign(&campaign.id).await.unwrap();
    campaigns.delete_campaign(&campaign.id).await;

    let mut documents = DocumentSynchronizer::new(mode.clone(), ids.clone());
    documents.load().await;
    let doc = documents
        .save_document(NewDocument {
            opportunity_id: "real-1-0".to_string(),
            opportunity_title: "Scheme".to_string(),
            content: DocumentContent::OnePager(OnePager::default()),
        })
        .await
        .unwrap();
    documents.delete_document(&doc.id).await;

    let mut opportunities = OpportunitySynchronizer::new(mode);
    opportunities.load().await;
    opportunities
        .record_search(vec![opportunity("1")], Vec::new())
        .await;
    opportunities.toggle_watchlist(opportunity("1")).await;

    assert_eq!(gateway.calls(), 0);
}

#[tokio::test]
async fn configured_gateway_sees_every_operation_kind() {
    let (gateway, mode) = remote();
    let ids = generator();
    let mut crm = CrmSynchronizer::new(mode.clone(), ids.clone());

    let mut last = gateway.calls();
    let mut step = |label: &str| {
        let now = gateway.calls();
        assert!(now > last, "{} did not reach the gateway", label);
        last = now;
    };

    crm.load().await;
    step("load");
    let ada = crm.create_contact(contact("Ada", "Stone")).await.unwrap();
    step("create_contact");
    crm.update_contact(&ada.id, ContactUpdate {
        job_title: Some("Project Director".to_string()),
        ..Default::default()
    })
    .await
    .unwrap();
    step("update_contact");
    let company = crm
        .create_company(NewCompany {
            name: "Northgate".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    step("create_company");
    crm.update_company(&company.id, CompanyUpdate {
        notes: Some("Framework supplier".to_string()),
        ..Default::default()
    })
    .await
    .unwrap();
    step("update_company");
    let lead = stage_by_name(&crm, "Lead").id.clone();
    let won = stage_by_name(&crm, "Won").id.clone();
    let created = crm
        .create_deal(deal("Fit-out", &ada.id, &lead, "£20,000"))
        .await
        .unwrap();
    step("create_deal");
    crm.update_deal(&created.id, DealUpdate {
        notes: Some("Chasing".to_string()),
        ..Default::default()
    })
    .await
    .unwrap();
    step("update_deal");
    crm.move_deal(&created.id, &won).await;
    step("move_deal");
    let note = crm
        .log_activity(&ada.id, ActivityType::Email, "Sent CV", "")
        .await;
    step("log_activity");
    crm.delete_activity(&note.id).await;
    step("delete_activity");
    crm.reorder_stages(vec![StagePosition {
        id: lead,
        position: 7,
    }])
    .await;
    step("reorder_stages");
    crm.apply_stage_changes(StageChanges {
        created: vec![NewStage {
            name: "On hold".to_string(),
            color: StageColor::Orange,
            position: 8,
        }],
        ..Default::default()
    })
    .await;
    step("apply_stage_changes");
    crm.delete_deal(&created.id).await;
    step("delete_deal");
    crm.delete_company(&company.id).await;
    step("delete_company");
    crm.delete_contact(&ada.id).await;
    step("delete_contact");

    let mut campaigns = CampaignSynchronizer::new(mode.clone(), ids.clone());
    campaigns.load().await;
    step("load campaigns");
    let campaign = campaigns
        .create_campaign(NewCampaign {
            name: "Spring outreach".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    step("create_campaign");
    campaigns
        .update_steps(&campaign.id, vec![EmailStep::default()])
        .await;
    step("update_steps");
    campaigns.delete_campaign(&campaign.id).await;
    step("delete_campaign");

    let mut documents = DocumentSynchronizer::new(mode.clone(), ids);
    documents.load().await;
    step("load documents");
    let doc = documents
        .save_document(NewDocument {
            opportunity_id: "real-1-0".to_string(),
            opportunity_title: "Scheme".to_string(),
            content: DocumentContent::OnePager(OnePager::default()),
        })
        .await
        .unwrap();
    step("save_document");
    documents.delete_document(&doc.id).await;
    step("delete_document");

    let mut opportunities = OpportunitySynchronizer::new(mode);
    opportunities
        .record_search(vec![opportunity("1")], Vec::new())
        .await;
    step("record_search");
    opportunities.toggle_watchlist(opportunity("1")).await;
    step("toggle_watchlist");
}

// ─────────────────────────────────────────────────────────────────────────────
// Identity
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn local_creates_get_distinct_local_ids() {
    let mut crm = CrmSynchronizer::new(SyncMode::select(None), Arc::new(IdentityGenerator::new()));
    let mut ids = Vec::new();
    for i in 0..50 {
        let created = crm
            .create_contact(contact(&format!("Name{}", i), "Surveyor"))
            .await
            .unwrap();
        ids.push(created.id);
    }
    let unique: HashSet<&String> = ids.iter().collect();
    assert_eq!(unique.len(), 50);
    assert!(ids.iter().all(|id| is_local_id(id)));
    // Each contact also produced a contact_created activity with its own id.
    assert_eq!(crm.activities().len(), 50);
    assert!(crm.activities().iter().all(|a| !unique.contains(&a.id)));
}

#[tokio::test]
async fn remote_ids_come_from_the_store() {
    let (_, mode) = remote();
    let mut crm = CrmSynchronizer::new(mode, generator());
    let created = crm.create_contact(contact("Ada", "Stone")).await.unwrap();
    assert!(!is_local_id(&created.id));
    assert_eq!(crm.activities()[0].title, "Ada Stone was added");
    assert_eq!(crm.activities()[0].activity_type, ActivityType::ContactCreated);
}

#[tokio::test]
async fn failed_remote_create_keeps_a_local_record() {
    let (gateway, mode) = remote();
    let mut crm = CrmSynchronizer::new(mode, generator());
    gateway.set_fail_writes(true);

    let created = crm.create_contact(contact("Ada", "Stone")).await.unwrap();
    assert_eq!(created.id, "local-1772357400000-1");
    assert_eq!(crm.contacts().len(), 1);

    // Later writes to the local record stay off the store.
    gateway.set_fail_writes(false);
    let before = gateway.calls();
    crm.update_contact(&created.id, ContactUpdate {
        notes: Some("Met at RICS event".to_string()),
        ..Default::default()
    })
    .await
    .unwrap();
    assert_eq!(gateway.calls(), before);
    assert_eq!(crm.contacts()[0].notes, "Met at RICS event");
}

/// A remote CRM holding one contact, one company and a deal in "Lead",
/// all with store-issued ids.
async fn seeded_remote_crm() -> (Arc<InMemoryGateway>, CrmSynchronizer) {
    let (gateway, mode) = remote();
    let mut crm = CrmSynchronizer::new(mode, generator());
    crm.load().await;
    let lead = stage_by_name(&crm, "Lead").id.clone();
    let ada = crm.create_contact(contact("Ada", "Stone")).await.unwrap();
    crm.create_company(NewCompany {
        name: "Stone & Marsh".to_string(),
        ..Default::default()
    })
    .await
    .unwrap();
    crm.create_deal(deal("Hospital", &ada.id, &lead, "£10,000"))
        .await
        .unwrap();
    (gateway, crm)
}

#[tokio::test]
async fn failed_remote_updates_still_apply_locally() {
    let (gateway, mut crm) = seeded_remote_crm().await;
    let contact_id = crm.contacts()[0].id.clone();
    let company_id = crm.companies()[0].id.clone();
    let deal_id = crm.deals()[0].id.clone();
    assert!(!is_local_id(&contact_id) && !is_local_id(&deal_id));
    gateway.set_fail_writes(true);

    let updated = crm
        .update_contact(&contact_id, ContactUpdate {
            notes: Some("Prefers calls".to_string()),
            ..Default::default()
        })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.notes, "Prefers calls");
    crm.update_company(&company_id, CompanyUpdate {
        industry: Some("Healthcare".to_string()),
        ..Default::default()
    })
    .await
    .unwrap();
    crm.update_deal(&deal_id, DealUpdate {
        title: Some("Hospital wing".to_string()),
        ..Default::default()
    })
    .await
    .unwrap();

    assert_eq!(crm.contacts()[0].notes, "Prefers calls");
    assert_eq!(crm.companies()[0].industry, "Healthcare");
    assert_eq!(crm.deals()[0].title, "Hospital wing");
    assert_eq!(crm.deals()[0].id, deal_id);

    // The store never saw the writes.
    let stored = gateway.get_contact(&contact_id).await.unwrap();
    assert_eq!(stored.notes, "");
    assert_eq!(gateway.list_deals().await[0].title, "Hospital");
}

#[tokio::test]
async fn failed_remote_deletes_still_remove_locally() {
    let (gateway, mut crm) = seeded_remote_crm().await;
    let contact_id = crm.contacts()[0].id.clone();
    let company_id = crm.companies()[0].id.clone();
    let deal_id = crm.deals()[0].id.clone();
    gateway.set_fail_writes(true);

    assert!(crm.delete_deal(&deal_id).await);
    assert!(crm.delete_company(&company_id).await);
    assert!(crm.delete_contact(&contact_id).await);
    assert!(crm.deals().is_empty());
    assert!(crm.companies().is_empty());
    assert!(crm.contacts().is_empty());
    assert!(crm.activities().is_empty());

    assert_eq!(gateway.list_deals().await.len(), 1);
    assert_eq!(gateway.list_contacts().await.len(), 1);
}

#[tokio::test]
async fn failed_remote_move_still_moves_and_logs() {
    let (gateway, mut crm) = seeded_remote_crm().await;
    let deal_id = crm.deals()[0].id.clone();
    let won = stage_by_name(&crm, "Won").id.clone();
    let activities_before = crm.activities().len();
    gateway.set_fail_writes(true);

    let activity = crm.move_deal(&deal_id, &won).await.unwrap();
    assert_eq!(activity.activity_type, ActivityType::DealMoved);
    assert_eq!(activity.description, "From Lead to Won");
    assert_eq!(activity.deal_id.as_deref(), Some(deal_id.as_str()));
    assert!(is_local_id(&activity.id));

    assert_eq!(crm.deals()[0].stage_id, won);
    assert_eq!(crm.activities().len(), activities_before + 1);
    assert_eq!(crm.activities()[0], activity);
    assert_ne!(gateway.list_deals().await[0].stage_id, won);
}

#[tokio::test]
async fn deal_probability_is_clamped_in_both_branches() {
    for (gateway, mode) in both_modes() {
        let mut crm = CrmSynchronizer::new(mode, generator());
        crm.load().await;
        let lead = stage_by_name(&crm, "Lead").id.clone();
        let ada = crm.create_contact(contact("Ada", "Stone")).await.unwrap();

        let mut over = deal("Depot", &ada.id, &lead, "£1");
        over.probability = 250;
        let created = crm.create_deal(over).await.unwrap();
        assert_eq!(created.probability, 100);

        let updated = crm
            .update_deal(&created.id, DealUpdate {
                probability: Some(180),
                ..Default::default()
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.probability, 100);

        if gateway.is_configured() {
            assert_eq!(gateway.list_deals().await[0].probability, 100);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cascades
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn deleting_a_contact_removes_its_deals_and_activities() {
    for (_, mode) in both_modes() {
        let mut crm = CrmSynchronizer::new(mode, generator());
        crm.load().await;
        let lead = stage_by_name(&crm, "Lead").id.clone();

        let ada = crm.create_contact(contact("Ada", "Stone")).await.unwrap();
        let bob = crm.create_contact(contact("Bob", "Marsh")).await.unwrap();
        crm.create_deal(deal("Hospital", &ada.id, &lead, "£1"))
            .await
            .unwrap();
        crm.create_deal(deal("School", &ada.id, &lead, "£2"))
            .await
            .unwrap();
        crm.create_deal(deal("Depot", &bob.id, &lead, "£3"))
            .await
            .unwrap();
        crm.log_activity(&ada.id, ActivityType::Call, "Call", "").await;
        crm.log_activity(&ada.id, ActivityType::Meeting, "Site visit", "")
            .await;

        let ada_items = crm.deals().iter().filter(|d| d.contact_id == ada.id).count()
            + crm
                .activities()
                .iter()
                .filter(|a| a.contact_id == ada.id)
                .count();
        assert_eq!(ada_items, 5);

        assert!(crm.delete_contact(&ada.id).await);
        assert!(crm.contact(&ada.id).is_none());
        assert!(crm.deals().iter().all(|d| d.contact_id != ada.id));
        assert!(crm.activities().iter().all(|a| a.contact_id != ada.id));
        assert_eq!(crm.deals().len(), 1);
        assert_eq!(crm.activities().len(), 1);
    }
}

#[tokio::test]
async fn deleting_a_company_orphans_its_contacts() {
    for (_, mode) in both_modes() {
        let mut crm = CrmSynchronizer::new(mode, generator());
        let company = crm
            .create_company(NewCompany {
                name: "Northgate".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        for (first, last) in [("Ada", "Stone"), ("Bob", "Marsh")] {
            let mut new = contact(first, last);
            new.company_id = Some(company.id.clone());
            crm.create_contact(new).await.unwrap();
        }

        assert!(crm.delete_company(&company.id).await);
        assert_eq!(crm.contacts().len(), 2);
        assert!(crm.contacts().iter().all(|c| c.company_id.is_none()));
        assert!(crm.companies().is_empty());
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stages
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn stage_changes_apply_delete_update_create_then_sort() {
    for (_, mode) in both_modes() {
        let mut crm = CrmSynchronizer::new(mode, generator());
        crm.load().await;
        abc_pipeline(&mut crm).await;
        assert_eq!(stage_names(&crm), vec!["A", "B", "C"]);

        let ada = crm.create_contact(contact("Ada", "Stone")).await.unwrap();
        let a = stage_by_name(&crm, "A").id.clone();
        let b = stage_by_name(&crm, "B").id.clone();
        crm.create_deal(deal("In B", &ada.id, &b, "£1"))
            .await
            .unwrap();
        crm.create_deal(deal("In A", &ada.id, &a, "£1"))
            .await
            .unwrap();

        crm.apply_stage_changes(StageChanges {
            deleted: vec![b.clone()],
            updated: vec![StageEdit {
                id: a.clone(),
                name: "A".to_string(),
                color: StageColor::Slate,
                position: 1,
            }],
            created: vec![NewStage {
                name: "D".to_string(),
                color: StageColor::Cyan,
                position: 0,
            }],
        })
        .await;

        assert_eq!(stage_names(&crm), vec!["D", "A", "C"]);
        let positions: Vec<i32> = crm.stages().iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        assert!(crm.deals().iter().all(|d| d.stage_id != b));
        assert_eq!(crm.deals().len(), 1);
    }
}

#[tokio::test]
async fn empty_stage_refetch_keeps_local_result() {
    let (gateway, mode) = remote();
    let mut crm = CrmSynchronizer::new(mode, generator());
    crm.load().await;
    let lost = stage_by_name(&crm, "Lost").id.clone();

    gateway.set_fail_reads(true);
    crm.apply_stage_changes(StageChanges {
        deleted: vec![lost],
        ..Default::default()
    })
    .await;
    assert_eq!(stage_names(&crm), DEFAULT_NAMES[..5].to_vec());
}

#[tokio::test]
async fn reorder_persists_positions_and_resorts() {
    for (gateway, mode) in both_modes() {
        let mut crm = CrmSynchronizer::new(mode, generator());
        crm.load().await;
        let lead = stage_by_name(&crm, "Lead").id.clone();
        crm.reorder_stages(vec![StagePosition {
            id: lead,
            position: 10,
        }])
        .await;
        assert_eq!(stage_names(&crm).last().map(String::as_str), Some("Lead"));
        if crm.mode().is_remote() {
            let stored = gateway.list_stages().await;
            assert_eq!(stored.last().map(|s| s.name.as_str()), Some("Lead"));
        }
    }
}

#[tokio::test]
async fn empty_pipeline_is_bootstrapped_with_defaults() {
    for (_, mode) in both_modes() {
        let remote = mode.is_remote();
        let mut crm = CrmSynchronizer::new(mode, generator());
        crm.load().await;
        assert_eq!(stage_names(&crm), DEFAULT_NAMES.to_vec());
        assert!(crm.stages().iter().all(|s| is_local_id(&s.id) != remote));
    }
}

#[tokio::test]
async fn failed_initialize_falls_back_to_local_defaults() {
    let (gateway, mode) = remote();
    gateway.set_fail_initialize(true);
    let mut crm = CrmSynchronizer::new(mode, generator());
    crm.load().await;
    assert_eq!(stage_names(&crm), DEFAULT_NAMES.to_vec());
    assert!(crm.stages().iter().all(|s| is_local_id(&s.id)));
    let colors: Vec<StageColor> = crm.stages().iter().map(|s| s.color).collect();
    assert_eq!(colors[0], StageColor::Slate);
    assert_eq!(colors[4], StageColor::Emerald);
}

#[tokio::test]
async fn existing_remote_pipeline_is_not_reseeded() {
    let (gateway, mode) = remote();
    gateway.seed_stages(vec![PipelineStage {
        id: "stage-existing".to_string(),
        name: "Enquiry".to_string(),
        color: StageColor::Indigo,
        position: 0,
        created_at: "2026-01-01T00:00:00.000Z".to_string(),
    }]);
    let mut crm = CrmSynchronizer::new(mode, generator());
    crm.load().await;
    assert_eq!(stage_names(&crm), vec!["Enquiry"]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Deals
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn moving_a_deal_logs_one_activity_naming_both_stages() {
    for (_, mode) in both_modes() {
        let mut crm = CrmSynchronizer::new(mode, generator());
        crm.load().await;
        let ada = crm.create_contact(contact("Ada", "Stone")).await.unwrap();
        let lead = stage_by_name(&crm, "Lead").id.clone();
        let won = stage_by_name(&crm, "Won").id.clone();
        let created = crm
            .create_deal(deal("Leeds hospital", &ada.id, &lead, "£250,000"))
            .await
            .unwrap();
        let before = crm.activities().len();

        let activity = crm.move_deal(&created.id, &won).await.unwrap();
        assert_eq!(crm.activities().len(), before + 1);
        assert_eq!(activity.activity_type, ActivityType::DealMoved);
        assert_eq!(activity.title, "Deal \"Leeds hospital\" moved to Won");
        assert_eq!(activity.description, "From Lead to Won");
        assert_eq!(activity.deal_id.as_deref(), Some(created.id.as_str()));
        assert_eq!(crm.deal(&created.id).unwrap().stage_id, won);

        // Same stage: nothing happens.
        assert!(crm.move_deal(&created.id, &won).await.is_none());
        assert_eq!(crm.activities().len(), before + 1);
    }
}

#[tokio::test]
async fn moving_to_an_unknown_stage_reads_unknown() {
    for (_, mode) in both_modes() {
        let mut crm = CrmSynchronizer::new(mode, generator());
        crm.load().await;
        let ada = crm.create_contact(contact("Ada", "Stone")).await.unwrap();
        let lead = stage_by_name(&crm, "Lead").id.clone();
        let created = crm
            .create_deal(deal("Depot", &ada.id, &lead, ""))
            .await
            .unwrap();

        let activity = crm.move_deal(&created.id, "no-such-stage").await.unwrap();
        assert_eq!(activity.title, "Deal \"Depot\" moved to unknown");
        assert_eq!(activity.description, "From Lead to unknown");
        assert!(crm.move_deal("no-such-deal", &lead).await.is_none());
    }
}

#[tokio::test]
async fn deal_with_unknown_stage_is_rejected() {
    let mut crm = CrmSynchronizer::new(SyncMode::select(None), generator());
    crm.load().await;
    let ada = crm.create_contact(contact("Ada", "Stone")).await.unwrap();
    let err = crm
        .create_deal(deal("Depot", &ada.id, "missing", "£1"))
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(crm.deals().is_empty());
}

#[tokio::test]
async fn blank_required_fields_are_rejected() {
    let (gateway, mode) = remote();
    let mut crm = CrmSynchronizer::new(mode, generator());
    assert!(crm.create_contact(contact("", "Stone")).await.is_err());
    assert!(crm
        .create_company(NewCompany::default())
        .await
        .unwrap_err()
        .is_validation());
    assert_eq!(gateway.calls(), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Activities
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn global_activity_needs_a_contact() {
    for (_, mode) in both_modes() {
        let mut crm = CrmSynchronizer::new(mode, generator());
        assert!(crm
            .log_global_activity(ActivityType::Note, "Market update", "")
            .await
            .is_none());

        crm.create_contact(contact("Ada", "Stone")).await.unwrap();
        let bob = crm.create_contact(contact("Bob", "Marsh")).await.unwrap();
        let activity = crm
            .log_global_activity(ActivityType::Note, "Market update", "Rates up")
            .await
            .unwrap();
        // Contacts are newest first, so the first contact is Bob.
        assert_eq!(activity.contact_id, bob.id);
        assert_eq!(crm.activities()[0].id, activity.id);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Campaigns and documents
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicating_a_campaign_makes_a_draft_copy() {
    for (_, mode) in both_modes() {
        let mut campaigns = CampaignSynchronizer::new(mode, generator());
        let original = campaigns
            .create_campaign(NewCampaign {
                name: "Leeds hospital".to_string(),
                status: CampaignStatus::Active,
                opportunity_id: Some("real-1-0".to_string()),
                linked_contact_ids: vec!["c-1".to_string()],
                steps: vec![EmailStep {
                    subject: "Intro".to_string(),
                    ..Default::default()
                }],
            })
            .await
            .unwrap();

        let copy = campaigns
            .duplicate_campaign(&original.id)
            .await
            .unwrap()
            .unwrap();
        assert_ne!(copy.id, original.id);
        assert_eq!(copy.name, "Leeds hospital (Copy)");
        assert_eq!(copy.status, CampaignStatus::Draft);
        assert_eq!(copy.steps, original.steps);
        assert_eq!(campaigns.campaigns()[0].id, copy.id);
        assert!(campaigns.duplicate_campaign("missing").await.unwrap().is_none());
    }
}

#[tokio::test]
async fn campaign_status_and_links_update_in_place() {
    for (_, mode) in both_modes() {
        let mut campaigns = CampaignSynchronizer::new(mode, generator());
        let campaign = campaigns
            .create_campaign(NewCampaign {
                name: "Spring".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let updated = campaigns
            .change_status(&campaign.id, CampaignStatus::Completed)
            .await
            .unwrap();
        assert_eq!(updated.status, CampaignStatus::Completed);
        let linked = campaigns
            .link_contacts(&campaign.id, vec!["a".into(), "b".into(), "a".into()])
            .await
            .unwrap();
        assert_eq!(linked.linked_contact_ids, vec!["a", "b"]);
    }
}

#[tokio::test]
async fn document_content_updates_keep_their_kind() {
    for (_, mode) in both_modes() {
        let mut documents = DocumentSynchronizer::new(mode, generator());
        let saved = documents
            .save_document(NewDocument {
                opportunity_id: "real-1-0".to_string(),
                opportunity_title: "Scheme".to_string(),
                content: DocumentContent::EmailSequence(EmailSequence {
                    steps: vec![EmailStep::default()],
                    opportunity_id: "real-1-0".to_string(),
                }),
            })
            .await
            .unwrap();

        let edited = DocumentContent::EmailSequence(EmailSequence {
            steps: vec![EmailStep {
                subject: "Edited".to_string(),
                ..Default::default()
            }],
            opportunity_id: "real-1-0".to_string(),
        });
        let updated = documents
            .update_document_content(&saved.id, edited.clone())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.content, edited);

        let wrong_kind = DocumentContent::OnePager(OnePager::default());
        assert!(documents
            .update_document_content(&saved.id, wrong_kind)
            .await
            .is_err());
        assert_eq!(documents.documents_for_opportunity("real-1-0").len(), 1);
    }
}

#[tokio::test]
async fn reload_restores_remote_documents() {
    let (gateway, mode) = remote();
    let mut documents = DocumentSynchronizer::new(mode.clone(), generator());
    documents
        .save_document(NewDocument {
            opportunity_id: "real-1-0".to_string(),
            opportunity_title: "Scheme".to_string(),
            content: DocumentContent::OnePager(OnePager::default()),
        })
        .await
        .unwrap();

    let mut fresh = DocumentSynchronizer::new(mode, generator());
    fresh.load().await;
    assert_eq!(fresh.documents(), documents.documents());
    assert!(gateway.calls() >= 2);
}

// ─────────────────────────────────────────────────────────────────────────────
// Opportunities
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn found_and_watched_leads_merge_by_id() {
    for (_, mode) in both_modes() {
        let mut opportunities = OpportunitySynchronizer::new(mode);
        opportunities
            .record_search(vec![opportunity("1"), opportunity("2")], Vec::new())
            .await;
        assert!(opportunities.toggle_watchlist(opportunity("2")).await);
        assert!(opportunities.toggle_watchlist(opportunity("3")).await);

        let ids: Vec<String> = opportunities
            .all_opportunities()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);

        assert!(!opportunities.toggle_watchlist(opportunity("2")).await);
        assert!(!opportunities.is_watched("2"));
    }
}

#[tokio::test]
async fn watchlist_survives_a_remote_reload() {
    let (_, mode) = remote();
    let mut opportunities = OpportunitySynchronizer::new(mode.clone());
    opportunities.toggle_watchlist(opportunity("9")).await;

    let mut fresh = OpportunitySynchronizer::new(mode);
    fresh.load().await;
    assert!(fresh.is_watched("9"));
}
