//! Policy administration: the catalog bootstrap and account approval.

use crate::config::NgacConfig;
use crate::error::{require_non_empty, NgacError, Result};
use crate::graph::NodeType;
use crate::identity::{get_user, ClientIdentity, Role};
use crate::pdp::AccessDecisionPoint;
use crate::persistence::PolicyStoreAdapter;
use crate::prohibitions::{ContainerCondition, Prohibition};
use crate::storage::RecordStore;
use crate::store::PolicyStore;
use std::collections::BTreeMap;
use tracing::{info, warn};

pub const ACCOUNTS_PC: &str = "accounts";
pub const ASSETS_PC: &str = "assets";
pub const ADMINISTRATORS_UA: &str = "Administrators";
pub const ACCOUNT_USERS_UA: &str = "account_users";
pub const BLOSSOM_ADMIN_OA: &str = "blossom_admin";
pub const BLOSSOM_OBJECT: &str = "blossom_object";
pub const ALL_ACCOUNTS_OA: &str = "all_accounts";
pub const ALL_ASSETS_OA: &str = "all_assets";

/// Permission names used by the catalog policy.
pub mod permissions {
    pub const APPROVE_ACCOUNT: &str = "approve_account";
    pub const APPROVE_CHECKOUT: &str = "approve_checkout";
    pub const UPLOAD_ATO: &str = "upload_ato";
    pub const UPDATE_ACCOUNT_STATUS: &str = "update_account_status";
    pub const CHECK_OUT: &str = "check_out";
    pub const INITIATE_CHECK_IN: &str = "initiate_check_in";
    pub const PROCESS_CHECK_IN: &str = "process_check_in";
    pub const REPORT_SWID: &str = "report_swid";
    pub const DELETE_SWID: &str = "delete_swid";
    pub const ONBOARD_ASSET: &str = "onboard_asset";
    pub const OFFBOARD_ASSET: &str = "offboard_asset";
    pub const VIEW_ASSETS: &str = "view_assets";
    pub const VIEW_ASSET_PUBLIC: &str = "view_asset_public";
    pub const VIEW_ASSET_PRIVATE: &str = "view_asset_private";

    /// Everything that can be granted on an account object.
    pub const ACCOUNT_PERMISSIONS: [&str; 7] = [
        UPLOAD_ATO,
        UPDATE_ACCOUNT_STATUS,
        CHECK_OUT,
        INITIATE_CHECK_IN,
        PROCESS_CHECK_IN,
        REPORT_SWID,
        DELETE_SWID,
    ];
}

use self::permissions::*;

/// Id of the user attribute grouping an account's members.
pub fn account_ua(account: &str) -> String {
    account.to_string()
}

/// Id of the object representing an account.
pub fn account_object_name(account: &str) -> String {
    format!("{}_account", account)
}

fn isolation_prohibition_name(account: &str) -> String {
    format!("{}_isolation", account)
}

/// Build the base catalog policy with `admin_user` as its first administrator.
pub fn load_catalog_policy(admin_user: &str) -> Result<PolicyStore> {
    require_non_empty("admin user", admin_user)?;

    let mut store = PolicyStore::new();
    let graph = store.graph_mut();

    graph.create_node(ACCOUNTS_PC, NodeType::PolicyClass, BTreeMap::new(), &[])?;
    graph.create_node(ASSETS_PC, NodeType::PolicyClass, BTreeMap::new(), &[])?;

    graph.create_node(
        ADMINISTRATORS_UA,
        NodeType::UserAttribute,
        BTreeMap::new(),
        &[ACCOUNTS_PC, ASSETS_PC],
    )?;
    graph.create_node(admin_user, NodeType::User, BTreeMap::new(), &[ADMINISTRATORS_UA])?;

    graph.create_node(
        ACCOUNT_USERS_UA,
        NodeType::UserAttribute,
        BTreeMap::new(),
        &[ACCOUNTS_PC, ASSETS_PC],
    )?;
    for role in Role::ALL {
        graph.create_node(role.as_str(), NodeType::UserAttribute, BTreeMap::new(), &[ACCOUNT_USERS_UA])?;
    }

    graph.create_node(BLOSSOM_ADMIN_OA, NodeType::ObjectAttribute, BTreeMap::new(), &[ACCOUNTS_PC])?;
    graph.create_node(BLOSSOM_OBJECT, NodeType::Object, BTreeMap::new(), &[BLOSSOM_ADMIN_OA])?;
    graph.create_node(ALL_ACCOUNTS_OA, NodeType::ObjectAttribute, BTreeMap::new(), &[ACCOUNTS_PC])?;
    graph.create_node(ALL_ASSETS_OA, NodeType::ObjectAttribute, BTreeMap::new(), &[ASSETS_PC])?;

    graph.associate(ADMINISTRATORS_UA, BLOSSOM_ADMIN_OA, [APPROVE_ACCOUNT, APPROVE_CHECKOUT])?;
    graph.associate(
        ADMINISTRATORS_UA,
        ALL_ACCOUNTS_OA,
        [UPDATE_ACCOUNT_STATUS, PROCESS_CHECK_IN],
    )?;
    graph.associate(
        ADMINISTRATORS_UA,
        ALL_ASSETS_OA,
        [
            ONBOARD_ASSET,
            OFFBOARD_ASSET,
            VIEW_ASSETS,
            VIEW_ASSET_PUBLIC,
            VIEW_ASSET_PRIVATE,
        ],
    )?;
    graph.associate(ACCOUNT_USERS_UA, ALL_ASSETS_OA, [VIEW_ASSETS, VIEW_ASSET_PUBLIC])?;
    graph.associate(
        Role::SystemOwner.as_str(),
        ALL_ACCOUNTS_OA,
        [UPLOAD_ATO, CHECK_OUT, INITIATE_CHECK_IN, REPORT_SWID, DELETE_SWID],
    )?;
    graph.associate(
        Role::SystemAdministrator.as_str(),
        ALL_ACCOUNTS_OA,
        [INITIATE_CHECK_IN, REPORT_SWID, DELETE_SWID],
    )?;
    graph.associate(Role::AcquisitionSpecialist.as_str(), ALL_ACCOUNTS_OA, [CHECK_OUT])?;

    Ok(store)
}

/// Add an approved account to the catalog policy.
///
/// Creates the account's user attribute and object, and a prohibition that
/// keeps the account's members off every other account's object.
pub fn add_account(store: &mut PolicyStore, account: &str) -> Result<()> {
    require_non_empty("account", account)?;
    let ua = account_ua(account);
    let object = account_object_name(account);
    let prohibition_name = isolation_prohibition_name(account);

    // Check everything up front so a failure leaves the store untouched.
    for id in [&ua, &object] {
        if store.graph().exists(id) {
            return Err(NgacError::DuplicateNode(id.clone()));
        }
    }
    if store.prohibitions().get(&prohibition_name).is_some() {
        return Err(NgacError::DuplicateProhibition(prohibition_name));
    }

    let graph = store.graph_mut();
    graph.create_node(&ua, NodeType::UserAttribute, BTreeMap::new(), &[ACCOUNT_USERS_UA])?;
    graph.create_node(&object, NodeType::Object, BTreeMap::new(), &[ALL_ACCOUNTS_OA])?;

    store.prohibitions_mut().add(
        Prohibition::new(prohibition_name, ua, ACCOUNT_PERMISSIONS)
            .with_intersection(true)
            .with_container(ContainerCondition::inside(ALL_ACCOUNTS_OA))
            .with_container(ContainerCondition::outside(object)),
    )?;
    Ok(())
}

/// Fail unless `account` was added through [`add_account`]: its user
/// attribute sits under `account_users`, and its object and isolation
/// prohibition exist. Catalog nodes never qualify, whatever their name.
pub fn ensure_approved_account(store: &PolicyStore, user: &str, account: &str) -> Result<()> {
    let ua = account_ua(account);
    let graph = store.graph();
    let node = graph
        .node(&ua)
        .ok_or_else(|| NgacError::NodeNotFound(ua.clone()))?;

    let reserved = account.parse::<Role>().is_ok()
        || matches!(account, ADMINISTRATORS_UA | ACCOUNT_USERS_UA);
    let object = account_object_name(account);
    let approved = !reserved
        && node.kind == NodeType::UserAttribute
        && graph.is_assigned(&ua, ACCOUNT_USERS_UA)
        && graph
            .node(&object)
            .is_some_and(|n| n.kind == NodeType::Object)
        && graph.is_assigned(&object, ALL_ACCOUNTS_OA)
        && store
            .prohibitions()
            .get(&isolation_prohibition_name(account))
            .is_some_and(|p| p.subject == ua);

    if !approved {
        warn!("{} claims {} which is not an approved account", user, account);
        return Err(NgacError::Unauthorized {
            principal: user.to_string(),
            action: format!("act for unapproved account {}", account),
        });
    }
    Ok(())
}

/// Administrative entry points over the catalog namespace.
pub struct PolicyAdministrationPoint<R> {
    pdp: AccessDecisionPoint<R>,
}

impl<R: RecordStore> PolicyAdministrationPoint<R> {
    pub fn new(records: R, config: NgacConfig) -> Self {
        Self {
            pdp: AccessDecisionPoint::new(records, config),
        }
    }

    pub fn config(&self) -> &NgacConfig {
        self.pdp.config()
    }

    pub fn adapter(&self) -> &PolicyStoreAdapter<R> {
        self.pdp.adapter()
    }

    /// One-time construction of the catalog policy.
    ///
    /// Only a member of the administrative organization may call this, and
    /// only while the catalog namespace is empty. The caller becomes the
    /// first administrator. Nothing is written until the final save.
    pub fn initialize_catalog(&self, identity: &dyn ClientIdentity) -> Result<()> {
        let namespace = &self.config().catalog_namespace;

        if !self.adapter().load(namespace)?.is_empty() {
            warn!("Rejected repeated initialization of namespace {}", namespace);
            return Err(NgacError::AlreadyInitialized(namespace.clone()));
        }

        let msp_id = identity.msp_id()?;
        if msp_id != self.config().admin_msp {
            warn!("MSP {} attempted to initialize the catalog policy", msp_id);
            return Err(NgacError::Unauthorized {
                principal: format!("users in MSP {}", msp_id),
                action: "initialize ngac graphs".to_string(),
            });
        }

        let admin_user = get_user(identity)?;
        let store = load_catalog_policy(&admin_user)?;
        self.adapter().save(namespace, &store)?;

        info!(
            "Initialized catalog policy in namespace {} with administrator {}",
            namespace, admin_user
        );
        Ok(())
    }

    /// Approve `account` on behalf of an administrator.
    pub fn approve_account(&self, identity: &dyn ClientIdentity, account: &str) -> Result<()> {
        require_non_empty("account", account)?;
        if account == self.config().admin_msp {
            return Err(NgacError::InvalidArgument(format!(
                "{} is the administrative organization and cannot be an account",
                account
            )));
        }

        self.pdp.can_approve_account(identity)?;

        let namespace = &self.config().catalog_namespace;
        let mut store = self.adapter().load(namespace)?;
        add_account(&mut store, account)?;
        self.adapter().save(namespace, &store)?;

        info!("Approved account {} in namespace {}", account, namespace);
        Ok(())
    }
}
