//! The access decision point.
//!
//! A check is split in two steps. [`bind_user`] places the caller in the
//! graph under their account and role; it is idempotent and only reports
//! whether anything changed. [`Decider`] then computes permissions as a pure
//! function of the graph and prohibitions.

use crate::config::NgacConfig;
use crate::error::{require_non_empty, NgacError, Result};
use crate::graph::{Direction, NodeType, PolicyGraph};
use crate::identity::{get_user, ClientIdentity, Role};
use crate::pap::{self, permissions::*, ALL_ASSETS_OA, BLOSSOM_OBJECT};
use crate::persistence::PolicyStoreAdapter;
use crate::prohibitions::Prohibitions;
use crate::storage::RecordStore;
use crate::store::PolicyStore;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Ensure `user` exists and is assigned to both `account_ua` and `role_ua`.
///
/// Missing edges are added to an existing user node; existing edges are
/// never removed. Returns `true` if the graph was modified. Both parents are
/// validated before anything is written.
pub fn bind_user(graph: &mut PolicyGraph, user: &str, account_ua: &str, role_ua: &str) -> Result<bool> {
    require_non_empty("user", user)?;
    for parent in [account_ua, role_ua] {
        let node = graph
            .node(parent)
            .ok_or_else(|| NgacError::NodeNotFound(parent.to_string()))?;
        if node.kind != NodeType::UserAttribute {
            return Err(NgacError::InvalidAssignment {
                child: user.to_string(),
                parent: parent.to_string(),
                reason: format!("{} is not a user attribute", parent),
            });
        }
    }

    match graph.node(user).map(|node| node.kind) {
        None => {
            debug!("Binding new user {} to {} and {}", user, account_ua, role_ua);
            graph.create_node(user, NodeType::User, BTreeMap::new(), &[account_ua, role_ua])?;
            Ok(true)
        }
        Some(NodeType::User) => {
            let mut changed = false;
            for parent in [account_ua, role_ua] {
                changed |= graph.assign(user, parent)?;
            }
            if changed {
                debug!("Added missing assignments for user {}", user);
            }
            Ok(changed)
        }
        Some(_) => Err(NgacError::DuplicateNode(user.to_string())),
    }
}

/// Pure permission computation over one graph and its prohibitions.
#[derive(Debug, Clone, Copy)]
pub struct Decider<'a> {
    graph: &'a PolicyGraph,
    prohibitions: &'a Prohibitions,
}

impl<'a> Decider<'a> {
    pub fn new(graph: &'a PolicyGraph, prohibitions: &'a Prohibitions) -> Self {
        Self {
            graph,
            prohibitions,
        }
    }

    pub fn from_store(store: &'a PolicyStore) -> Self {
        Self::new(store.graph(), store.prohibitions())
    }

    /// Permissions `user` holds on `target`.
    ///
    /// Grants are collected from every user attribute above the user whose
    /// association targets the target or one of its ancestors. Prohibitions
    /// whose subject is the user or one of those attributes then remove what
    /// they cover.
    pub fn permissions(&self, user: &str, target: &str) -> Result<BTreeSet<String>> {
        let user_scope = self.graph.reachable(user, Direction::Ascending)?;
        let target_scope = self.graph.reachable(target, Direction::Ascending)?;

        let mut granted = BTreeSet::new();
        for ua in &user_scope {
            let is_ua = self
                .graph
                .node(ua)
                .is_some_and(|node| node.kind == NodeType::UserAttribute);
            if !is_ua {
                continue;
            }
            for (assoc_target, ops) in self.graph.associations(ua)? {
                if target_scope.contains(assoc_target) {
                    granted.extend(ops.iter().cloned());
                }
            }
        }

        for prohibition in self.prohibitions.all() {
            if user_scope.contains(&prohibition.subject) && prohibition.applies_to(&target_scope) {
                debug!(
                    "Prohibition {} removes {:?} for {} on {}",
                    prohibition.name, prohibition.operations, user, target
                );
                for op in &prohibition.operations {
                    granted.remove(op);
                }
            }
        }

        Ok(granted)
    }

    /// Whether `user` holds every one of `permissions` on `target`.
    pub fn has_permissions(&self, user: &str, target: &str, permissions: &[&str]) -> Result<bool> {
        if permissions.is_empty() {
            return Err(NgacError::InvalidArgument(
                "at least one permission is required".to_string(),
            ));
        }
        let held = self.permissions(user, target)?;
        Ok(permissions.iter().all(|p| held.contains(*p)))
    }
}

/// Where the caller sits in the catalog graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerBinding {
    pub user: String,
    /// `None` for members of the administrative organization.
    pub account: Option<String>,
    pub role: Option<Role>,
}

/// Runs authorization checks against the catalog policy store.
#[derive(Debug, Clone)]
pub struct AccessDecisionPoint<R> {
    adapter: PolicyStoreAdapter<R>,
    config: NgacConfig,
}

impl<R: RecordStore> AccessDecisionPoint<R> {
    pub fn new(records: R, config: NgacConfig) -> Self {
        Self {
            adapter: PolicyStoreAdapter::new(records),
            config,
        }
    }

    pub fn config(&self) -> &NgacConfig {
        &self.config
    }

    pub fn adapter(&self) -> &PolicyStoreAdapter<R> {
        &self.adapter
    }

    /// Resolve the caller's user name, account and role. Fails before any
    /// store access if a non-administrator has no valid role.
    pub fn resolve_binding(&self, identity: &dyn ClientIdentity) -> Result<CallerBinding> {
        let user = get_user(identity)?;
        let msp_id = identity.msp_id()?;

        if msp_id == self.config.admin_msp {
            return Ok(CallerBinding {
                user,
                account: None,
                role: None,
            });
        }

        let role = identity
            .attribute(&self.config.role_attribute)?
            .ok_or_else(|| NgacError::MissingRole(user.clone()))?
            .parse::<Role>()?;

        Ok(CallerBinding {
            user,
            account: Some(msp_id),
            role: Some(role),
        })
    }

    /// Authorize `permission` on `target` for the caller.
    pub fn check(&self, identity: &dyn ClientIdentity, target: &str, permission: &str) -> Result<()> {
        require_non_empty("target", target)?;
        require_non_empty("permission", permission)?;

        let binding = self.resolve_binding(identity)?;
        let namespace = &self.config.catalog_namespace;
        let mut store = self.adapter.load(namespace)?;

        if let (Some(account), Some(role)) = (&binding.account, binding.role) {
            pap::ensure_approved_account(&store, &binding.user, account)?;
            let account_ua = pap::account_ua(account);
            if bind_user(store.graph_mut(), &binding.user, &account_ua, role.as_str())? {
                self.adapter.save(namespace, &store)?;
            }
        }

        let held = Decider::from_store(&store).permissions(&binding.user, target)?;
        if held.contains(permission) {
            info!("Allowed {} for {} on {}", permission, binding.user, target);
            Ok(())
        } else {
            warn!("Denied {} for {} on {}", permission, binding.user, target);
            Err(NgacError::PermissionDenied {
                user: binding.user,
                permission: permission.to_string(),
                target: target.to_string(),
            })
        }
    }

    /// Only system owners may request a new account. Decided on the
    /// credential alone; the catalog is not consulted.
    pub fn can_request_account(&self, identity: &dyn ClientIdentity) -> Result<()> {
        let user = get_user(identity)?;
        let role = identity
            .attribute(&self.config.role_attribute)?
            .ok_or_else(|| NgacError::MissingRole(user.clone()))?;
        if role != Role::SystemOwner.as_str() {
            return Err(NgacError::Unauthorized {
                principal: user,
                action: "request an account".to_string(),
            });
        }
        Ok(())
    }

    pub fn can_approve_account(&self, identity: &dyn ClientIdentity) -> Result<()> {
        self.check(identity, BLOSSOM_OBJECT, APPROVE_ACCOUNT)
    }

    pub fn can_upload_ato(&self, identity: &dyn ClientIdentity, account: &str) -> Result<()> {
        self.check_account(identity, account, UPLOAD_ATO)
    }

    pub fn can_update_account_status(&self, identity: &dyn ClientIdentity, account: &str) -> Result<()> {
        self.check_account(identity, account, UPDATE_ACCOUNT_STATUS)
    }

    pub fn can_request_checkout(&self, identity: &dyn ClientIdentity, account: &str) -> Result<()> {
        self.check_account(identity, account, CHECK_OUT)
    }

    pub fn can_approve_checkout(&self, identity: &dyn ClientIdentity) -> Result<()> {
        self.check(identity, BLOSSOM_OBJECT, APPROVE_CHECKOUT)
    }

    pub fn can_initiate_check_in(&self, identity: &dyn ClientIdentity, account: &str) -> Result<()> {
        self.check_account(identity, account, INITIATE_CHECK_IN)
    }

    pub fn can_process_check_in(&self, identity: &dyn ClientIdentity, account: &str) -> Result<()> {
        self.check_account(identity, account, PROCESS_CHECK_IN)
    }

    pub fn can_report_swid(&self, identity: &dyn ClientIdentity, account: &str) -> Result<()> {
        self.check_account(identity, account, REPORT_SWID)
    }

    pub fn can_delete_swid(&self, identity: &dyn ClientIdentity, account: &str) -> Result<()> {
        self.check_account(identity, account, DELETE_SWID)
    }

    pub fn can_onboard_asset(&self, identity: &dyn ClientIdentity) -> Result<()> {
        self.check(identity, ALL_ASSETS_OA, ONBOARD_ASSET)
    }

    pub fn can_offboard_asset(&self, identity: &dyn ClientIdentity) -> Result<()> {
        self.check(identity, ALL_ASSETS_OA, OFFBOARD_ASSET)
    }

    pub fn can_view_assets(&self, identity: &dyn ClientIdentity) -> Result<()> {
        self.check(identity, ALL_ASSETS_OA, VIEW_ASSETS)
    }

    pub fn can_view_asset_public(&self, identity: &dyn ClientIdentity) -> Result<()> {
        self.check(identity, ALL_ASSETS_OA, VIEW_ASSET_PUBLIC)
    }

    pub fn can_view_asset_private(&self, identity: &dyn ClientIdentity) -> Result<()> {
        self.check(identity, ALL_ASSETS_OA, VIEW_ASSET_PRIVATE)
    }

    fn check_account(&self, identity: &dyn ClientIdentity, account: &str, permission: &str) -> Result<()> {
        require_non_empty("account", account)?;
        self.check(identity, &pap::account_object_name(account), permission)
    }
}
