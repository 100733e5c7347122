use ngac_core::pap::{account_object_name, permissions, ALL_ASSETS_OA, ASSETS_PC};
use ngac_core::persistence::{GRAPH_KEY, OBLIGATIONS_KEY, PROHIBITIONS_KEY};
use ngac_core::{
    AccessDecisionPoint, FileRecords, InMemoryRecords, NgacConfig, NgacError, NodeType,
    PolicyAdministrationPoint, RecordStore, StaticIdentity,
};
use tempfile::tempdir;

const ROLE: &str = "blossom.role";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn admin() -> StaticIdentity {
    StaticIdentity::new("admin", "AdminMSP")
}

fn member(name: &str, org: &str, role: &str) -> StaticIdentity {
    StaticIdentity::new(name, org).with_attribute(ROLE, role)
}

fn initialized(records: InMemoryRecords) -> (PolicyAdministrationPoint<InMemoryRecords>, AccessDecisionPoint<InMemoryRecords>) {
    init_tracing();
    let pap = PolicyAdministrationPoint::new(records.clone(), NgacConfig::default());
    pap.initialize_catalog(&admin()).unwrap();
    let pdp = AccessDecisionPoint::new(records, NgacConfig::default());
    (pap, pdp)
}

#[test]
fn test_bootstrap_and_admin_decisions() {
    let records = InMemoryRecords::new();
    let (pap, pdp) = initialized(records.clone());

    let store = pap.adapter().load("catalog_coll").unwrap();
    assert_eq!(
        store.graph().node(ASSETS_PC).unwrap().kind,
        NodeType::PolicyClass
    );
    assert_eq!(
        store.graph().node(ALL_ASSETS_OA).unwrap().kind,
        NodeType::ObjectAttribute
    );

    pdp.check(&admin(), ALL_ASSETS_OA, permissions::VIEW_ASSETS).unwrap();
    pdp.can_view_assets(&admin()).unwrap();
    pdp.can_approve_account(&admin()).unwrap();
    pdp.can_onboard_asset(&admin()).unwrap();

    // an admin-only check never mutates the store
    let after = pap.adapter().load("catalog_coll").unwrap();
    assert_eq!(after, store);
}

#[test]
fn test_unrelated_user_without_role_is_rejected_before_mutation() {
    let records = InMemoryRecords::new();
    let (pap, pdp) = initialized(records);
    let before = pap.adapter().load("catalog_coll").unwrap();

    let stranger = StaticIdentity::new("mallory", "SomeOrg");
    let err = pdp
        .check(&stranger, ALL_ASSETS_OA, permissions::VIEW_ASSETS)
        .unwrap_err();
    assert!(matches!(err, NgacError::MissingRole(user) if user == "mallory:SomeOrg"));

    let bogus = member("mallory", "SomeOrg", "Janitor");
    assert!(matches!(
        pdp.can_view_assets(&bogus),
        Err(NgacError::InvalidRole(role)) if role == "Janitor"
    ));

    assert_eq!(pap.adapter().load("catalog_coll").unwrap(), before);
}

#[test]
fn test_bootstrap_twice_fails_and_leaves_store_unchanged() {
    let records = InMemoryRecords::new();
    let (pap, _) = initialized(records);
    let before = pap.adapter().load("catalog_coll").unwrap();

    assert!(matches!(
        pap.initialize_catalog(&admin()),
        Err(NgacError::AlreadyInitialized(ns)) if ns == "catalog_coll"
    ));
    assert_eq!(pap.adapter().load("catalog_coll").unwrap(), before);
}

#[test]
fn test_bootstrap_requires_admin_organization() {
    init_tracing();
    let records = InMemoryRecords::new();
    let pap = PolicyAdministrationPoint::new(records.clone(), NgacConfig::default());

    let err = pap
        .initialize_catalog(&StaticIdentity::new("eve", "AgencyA"))
        .unwrap_err();
    assert!(matches!(err, NgacError::Unauthorized { .. }));
    assert!(records.is_empty());

    // nothing was persisted, so a proper retry still succeeds
    pap.initialize_catalog(&admin()).unwrap();
}

#[test]
fn test_tenant_binding_is_idempotent() {
    let records = InMemoryRecords::new();
    let (pap, pdp) = initialized(records.clone());
    pap.approve_account(&admin(), "AgencyA").unwrap();

    let owner = member("olivia", "AgencyA", "SystemOwner");
    pdp.can_request_checkout(&owner, "AgencyA").unwrap();

    let store = pap.adapter().load("catalog_coll").unwrap();
    let user = "olivia:AgencyA";
    assert_eq!(store.graph().node(user).unwrap().kind, NodeType::User);
    let parents = store.graph().parents(user).unwrap();
    assert_eq!(parents.len(), 2);
    assert!(parents.contains("AgencyA"));
    assert!(parents.contains("SystemOwner"));

    let graph_bytes = records.get_record("catalog_coll", GRAPH_KEY).unwrap();
    pdp.can_request_checkout(&owner, "AgencyA").unwrap();
    assert_eq!(records.get_record("catalog_coll", GRAPH_KEY).unwrap(), graph_bytes);
    assert_eq!(pap.adapter().load("catalog_coll").unwrap(), store);
}

#[test]
fn test_role_permissions_on_account_object() {
    let records = InMemoryRecords::new();
    let (pap, pdp) = initialized(records);
    pap.approve_account(&admin(), "AgencyA").unwrap();

    let specialist = member("sam", "AgencyA", "AcquisitionSpecialist");
    pdp.can_request_checkout(&specialist, "AgencyA").unwrap();
    pdp.can_view_assets(&specialist).unwrap();

    let err = pdp.can_upload_ato(&specialist, "AgencyA").unwrap_err();
    match err {
        NgacError::PermissionDenied {
            user,
            permission,
            target,
        } => {
            assert_eq!(user, "sam:AgencyA");
            assert_eq!(permission, permissions::UPLOAD_ATO);
            assert_eq!(target, account_object_name("AgencyA"));
        }
        other => panic!("expected permission denied, got {:?}", other),
    }
    assert!(pdp.can_view_asset_private(&specialist).is_err());
    assert!(pdp.can_approve_checkout(&specialist).is_err());
}

#[test]
fn test_accounts_are_isolated_by_prohibition() {
    let records = InMemoryRecords::new();
    let (pap, pdp) = initialized(records);
    pap.approve_account(&admin(), "AgencyA").unwrap();
    pap.approve_account(&admin(), "AgencyB").unwrap();

    let owner_a = member("olivia", "AgencyA", "SystemOwner");
    pdp.can_report_swid(&owner_a, "AgencyA").unwrap();
    assert!(matches!(
        pdp.can_report_swid(&owner_a, "AgencyB"),
        Err(NgacError::PermissionDenied { .. })
    ));

    // administrators are not account members and keep their grants everywhere
    pdp.can_update_account_status(&admin(), "AgencyA").unwrap();
    pdp.can_process_check_in(&admin(), "AgencyB").unwrap();
}

#[test]
fn test_unapproved_account_cannot_bind() {
    let records = InMemoryRecords::new();
    let (pap, pdp) = initialized(records);
    let before = pap.adapter().load("catalog_coll").unwrap();

    let owner = member("olivia", "AgencyZ", "SystemOwner");
    assert!(matches!(
        pdp.can_view_assets(&owner),
        Err(NgacError::NodeNotFound(ua)) if ua == "AgencyZ"
    ));
    assert_eq!(pap.adapter().load("catalog_coll").unwrap(), before);
}

#[test]
fn test_catalog_attribute_names_are_not_accounts() {
    let records = InMemoryRecords::new();
    let (pap, pdp) = initialized(records);
    pap.approve_account(&admin(), "AgencyA").unwrap();
    let before = pap.adapter().load("catalog_coll").unwrap();

    let fake_admin = member("eve", "Administrators", "SystemOwner");
    assert!(matches!(
        pdp.can_approve_account(&fake_admin),
        Err(NgacError::Unauthorized { .. })
    ));
    assert!(pdp.can_view_asset_private(&fake_admin).is_err());

    let fake_role = member("eve", "SystemOwner", "SystemOwner");
    assert!(matches!(
        pdp.can_request_checkout(&fake_role, "AgencyA"),
        Err(NgacError::Unauthorized { .. })
    ));

    let fake_users = member("eve", "account_users", "AcquisitionSpecialist");
    assert!(pdp.can_view_assets(&fake_users).is_err());

    let store = pap.adapter().load("catalog_coll").unwrap();
    assert_eq!(store, before);
    assert!(!store.graph().exists("eve:Administrators"));
    assert!(!store.graph().exists("eve:SystemOwner"));
}

#[test]
fn test_only_administrators_approve_accounts() {
    let records = InMemoryRecords::new();
    let (pap, _) = initialized(records);
    pap.approve_account(&admin(), "AgencyA").unwrap();

    let owner = member("olivia", "AgencyA", "SystemOwner");
    assert!(matches!(
        pap.approve_account(&owner, "AgencyB"),
        Err(NgacError::PermissionDenied { .. })
    ));
    assert!(!pap
        .adapter()
        .load("catalog_coll")
        .unwrap()
        .graph()
        .exists("AgencyB"));

    assert!(matches!(
        pap.approve_account(&admin(), "AgencyA"),
        Err(NgacError::DuplicateNode(_))
    ));
    assert!(pap.approve_account(&admin(), "AdminMSP").is_err());
}

#[test]
fn test_request_account_requires_system_owner() {
    let pdp = AccessDecisionPoint::new(InMemoryRecords::new(), NgacConfig::default());

    pdp.can_request_account(&member("olivia", "AgencyA", "SystemOwner"))
        .unwrap();
    assert!(matches!(
        pdp.can_request_account(&member("sam", "AgencyA", "AcquisitionSpecialist")),
        Err(NgacError::Unauthorized { .. })
    ));
    assert!(matches!(
        pdp.can_request_account(&StaticIdentity::new("x", "AgencyA")),
        Err(NgacError::MissingRole(_))
    ));
}

#[test]
fn test_invalid_arguments_rejected() {
    let records = InMemoryRecords::new();
    let (_, pdp) = initialized(records);
    assert!(matches!(
        pdp.check(&admin(), "", permissions::VIEW_ASSETS),
        Err(NgacError::InvalidArgument(_))
    ));
    assert!(matches!(
        pdp.check(&admin(), ALL_ASSETS_OA, ""),
        Err(NgacError::InvalidArgument(_))
    ));
    assert!(matches!(
        pdp.can_upload_ato(&admin(), ""),
        Err(NgacError::InvalidArgument(_))
    ));
}

#[test]
fn test_custom_configuration() {
    init_tracing();
    let config = NgacConfig::from_toml_str(
        "admin_msp = \"BlossomMSP\"\ncatalog_namespace = \"catalog\"\nrole_attribute = \"role\"\n",
    )
    .unwrap();
    let records = InMemoryRecords::new();
    let pap = PolicyAdministrationPoint::new(records.clone(), config.clone());
    let pdp = AccessDecisionPoint::new(records.clone(), config);

    assert!(pap.initialize_catalog(&admin()).is_err());
    pap.initialize_catalog(&StaticIdentity::new("root", "BlossomMSP"))
        .unwrap();
    assert!(records.get_record("catalog", GRAPH_KEY).unwrap().is_some());

    pap.approve_account(&StaticIdentity::new("root", "BlossomMSP"), "AgencyA")
        .unwrap();
    let owner = StaticIdentity::new("olivia", "AgencyA").with_attribute("role", "SystemOwner");
    pdp.can_initiate_check_in(&owner, "AgencyA").unwrap();
}

#[test]
fn test_file_backed_store_survives_reopen() {
    init_tracing();
    let dir = tempdir().unwrap();

    {
        let pap = PolicyAdministrationPoint::new(FileRecords::new(dir.path()), NgacConfig::default());
        pap.initialize_catalog(&admin()).unwrap();
        pap.approve_account(&admin(), "AgencyA").unwrap();
    }

    let records = FileRecords::new(dir.path());
    for key in [GRAPH_KEY, PROHIBITIONS_KEY, OBLIGATIONS_KEY] {
        assert!(records.get_record("catalog_coll", key).unwrap().is_some());
    }

    let pdp = AccessDecisionPoint::new(records, NgacConfig::default());
    let owner = member("olivia", "AgencyA", "SystemOwner");
    pdp.can_delete_swid(&owner, "AgencyA").unwrap();
    pdp.can_view_asset_public(&owner).unwrap();
    assert!(pdp.can_offboard_asset(&owner).is_err());

    let pap = PolicyAdministrationPoint::new(FileRecords::new(dir.path()), NgacConfig::default());
    assert!(matches!(
        pap.initialize_catalog(&admin()),
        Err(NgacError::AlreadyInitialized(_))
    ));
}
