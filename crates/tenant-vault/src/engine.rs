//! The `VaultAccessEngine`: the single choke-point for cloud document
//! access, gating a [`StorageProvider`] behind the access matrix, legal
//! holds, and the audit log.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::warn;

use tenant_bus_core::{Bus, EventPayload};
use tenant_storage_core::{StorageFile, StorageProvider};
use tenant_types::{AccessAction, Decision, ResourceClass, Role, TenantError, UserId};

use crate::audit::{AuditEntry, AuditLog};
use crate::matrix::permits;
use crate::resolver::ResourceClassResolver;

/// Everything needed to decide one access: spec.md §4.4's `AccessRequest`.
#[derive(Debug, Clone)]
pub struct AccessRequest {
    /// Who is making the request.
    pub actor_id: UserId,
    /// The role the actor is acting under.
    pub actor_role: Role,
    /// The resource being accessed.
    pub resource_id: String,
    /// The class the caller believes the resource falls under.
    pub resource_class: ResourceClass,
    /// The operation requested.
    pub action: AccessAction,
    /// Caller IP, for the audit trail.
    pub ip: Option<String>,
    /// Caller user agent, for the audit trail.
    pub user_agent: Option<String>,
}

/// The outcome of an access check, independent of whether any I/O followed.
#[derive(Debug, Clone)]
pub struct AccessDecision {
    /// `allowed` or `denied`.
    pub decision: Decision,
    /// Present when `decision` is `denied`.
    pub reason: Option<String>,
}

/// Mediates every read/write/list/share/delete against vault-resident
/// documents. Holds the only `Arc<dyn StorageProvider>` in the runtime —
/// callers never get a raw handle to the provider.
pub struct VaultAccessEngine {
    provider: Arc<dyn StorageProvider>,
    resolver: Arc<dyn ResourceClassResolver>,
    bus: Bus,
    audit: AuditLog,
    legal_holds: DashMap<String, String>,
    resource_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl VaultAccessEngine {
    /// Build an engine in front of `provider`, auditing to `log_dir`.
    pub fn new(
        provider: Arc<dyn StorageProvider>,
        resolver: Arc<dyn ResourceClassResolver>,
        bus: Bus,
        log_dir: impl Into<std::path::PathBuf>,
    ) -> Self {
        Self {
            provider,
            resolver,
            bus,
            audit: AuditLog::spawn(log_dir),
            legal_holds: DashMap::new(),
            resource_locks: DashMap::new(),
        }
    }

    /// Place `resource_id` under legal hold: subsequent `delete` requests
    /// are denied with reason `legal_hold` until [`Self::release_legal_hold`].
    pub fn place_legal_hold(&self, resource_id: impl Into<String>, reason: impl Into<String>) {
        self.legal_holds.insert(resource_id.into(), reason.into());
    }

    /// Lift a previously placed legal hold.
    pub fn release_legal_hold(&self, resource_id: &str) {
        self.legal_holds.remove(resource_id);
    }

    fn lock_for(&self, resource_id: &str) -> Arc<Mutex<()>> {
        self.resource_locks
            .entry(resource_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run the decision procedure against `request`, appending an audit
    /// entry regardless of outcome. Does not perform any storage I/O; call
    /// one of [`Self::read`], [`Self::write`], [`Self::delete`],
    /// [`Self::list`] to also execute the gated operation.
    pub async fn decide(&self, request: &AccessRequest) -> AccessDecision {
        let resolved_class = self
            .resolver
            .resolve(request.actor_id.as_str(), &request.resource_id)
            .await;

        if let Some(authoritative) = resolved_class {
            if authoritative != request.resource_class {
                let decision = AccessDecision {
                    decision: Decision::Denied,
                    reason: Some("resource_class_mismatch".to_string()),
                };
                self.record(request, authoritative, &decision);
                return decision;
            }
        }
        let effective_class = resolved_class.unwrap_or(request.resource_class);

        if !permits(request.actor_role, effective_class, request.action) {
            let decision = AccessDecision {
                decision: Decision::Denied,
                reason: Some("matrix".to_string()),
            };
            self.record(request, effective_class, &decision);
            return decision;
        }

        if request.action == AccessAction::Delete {
            if let Some(hold_reason) = self.legal_holds.get(&request.resource_id) {
                let _ = hold_reason;
                let decision = AccessDecision {
                    decision: Decision::Denied,
                    reason: Some("legal_hold".to_string()),
                };
                self.record(request, effective_class, &decision);
                return decision;
            }
        }

        let decision = AccessDecision {
            decision: Decision::Allowed,
            reason: None,
        };
        self.record(request, effective_class, &decision);
        decision
    }

    fn record(&self, request: &AccessRequest, resolved_class: ResourceClass, decision: &AccessDecision) {
        self.audit.append(AuditEntry {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now(),
            actor_id: request.actor_id.clone(),
            action: request.action,
            resource_id: request.resource_id.clone(),
            resource_class: resolved_class,
            decision: decision.decision,
            reason: decision.reason.clone(),
            ip: request.ip.clone(),
            user_agent: request.user_agent.clone(),
        });
    }

    /// Gated read. Fails with `TenantError::Auth` on denial, never leaking
    /// whether the resource exists.
    pub async fn read(&self, request: AccessRequest) -> Result<Vec<u8>, TenantError> {
        let decision = self.decide(&request).await;
        if decision.decision == Decision::Denied {
            return Err(TenantError::Auth(
                decision.reason.unwrap_or_else(|| "denied".into()),
            ));
        }
        self.provider
            .download_file(&request.resource_id)
            .await
            .map_err(|e| TenantError::StorageUnavailable(e.to_string()))
    }

    /// Gated write. Publishes `document_added` on create, `document_processed`
    /// on overwrite.
    pub async fn write(
        &self,
        request: AccessRequest,
        content: &[u8],
        destination_path: &str,
        filename: &str,
        mime_type: Option<&str>,
    ) -> Result<StorageFile, TenantError> {
        let decision = self.decide(&request).await;
        if decision.decision == Decision::Denied {
            return Err(TenantError::Auth(
                decision.reason.unwrap_or_else(|| "denied".into()),
            ));
        }

        let lock = self.lock_for(&request.resource_id);
        let _guard = lock.lock().await;

        let existed = self
            .provider
            .file_exists(&request.resource_id)
            .await
            .unwrap_or(false);

        let file = self
            .provider
            .upload_file(content, destination_path, filename, mime_type)
            .await
            .map_err(|e| TenantError::StorageUnavailable(e.to_string()))?;

        let payload = if existed {
            EventPayload::DocumentProcessed {
                doc_id: tenant_types::DocId(request.resource_id.clone()),
            }
        } else {
            EventPayload::DocumentAdded {
                doc_id: tenant_types::DocId(request.resource_id.clone()),
                doc_type: None,
                filename: Some(filename.to_string()),
            }
        };
        self.bus
            .publish(payload, "vault_engine", Some(request.actor_id.clone()))
            .await;

        Ok(file)
    }

    /// Gated delete. Denies under active legal hold even if the matrix
    /// would otherwise allow it. Publishes an access-audit event with no
    /// content payload regardless of outcome.
    pub async fn delete(&self, request: AccessRequest) -> Result<bool, TenantError> {
        let decision = self.decide(&request).await;

        self.bus
            .publish(
                EventPayload::AccessAudited {
                    actor_id: request.actor_id.clone(),
                    resource_id: request.resource_id.clone(),
                    decision: decision.decision,
                    reason: decision.reason.clone(),
                },
                "vault_engine",
                Some(request.actor_id.clone()),
            )
            .await;

        if decision.decision == Decision::Denied {
            return Err(TenantError::Auth(
                decision.reason.unwrap_or_else(|| "denied".into()),
            ));
        }

        let lock = self.lock_for(&request.resource_id);
        let _guard = lock.lock().await;

        self.provider
            .delete_file(&request.resource_id)
            .await
            .map_err(|e| TenantError::StorageUnavailable(e.to_string()))
    }

    /// Gated list.
    pub async fn list(
        &self,
        request: AccessRequest,
        recursive: bool,
    ) -> Result<Vec<StorageFile>, TenantError> {
        let decision = self.decide(&request).await;
        if decision.decision == Decision::Denied {
            return Err(TenantError::Auth(
                decision.reason.unwrap_or_else(|| "denied".into()),
            ));
        }
        self.provider
            .list_files(&request.resource_id, recursive)
            .await
            .map_err(|e| TenantError::StorageUnavailable(e.to_string()))
    }
}

/// Tracks which `(user_id, resource_id)` pairs a caller has ever been
/// granted `share` access to. Not part of the spec's matrix itself; kept
/// here as the natural place a `ResourceClassResolver` implementation would
/// consult when computing `shared` membership for a concrete deployment.
#[derive(Debug, Default)]
pub struct ShareList {
    grants: DashMap<String, HashSet<String>>,
}

impl ShareList {
    /// A fresh, empty share list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `user_id` share access to `resource_id`.
    pub fn grant(&self, resource_id: impl Into<String>, user_id: impl Into<String>) {
        self.grants
            .entry(resource_id.into())
            .or_default()
            .insert(user_id.into());
    }

    /// Whether `user_id` has been granted access to `resource_id`.
    pub fn contains(&self, resource_id: &str, user_id: &str) -> bool {
        self.grants
            .get(resource_id)
            .map(|set| set.contains(user_id))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenant_bus_core::BusConfig;
    use tenant_storage_memory::MemoryStorageProvider;

    fn engine(log_dir: &std::path::Path) -> VaultAccessEngine {
        VaultAccessEngine::new(
            Arc::new(MemoryStorageProvider::new()),
            Arc::new(crate::resolver::TrustingResolver),
            Bus::new(BusConfig::default()),
            log_dir.to_path_buf(),
        )
    }

    fn request(role: Role, class: ResourceClass, action: AccessAction) -> AccessRequest {
        AccessRequest {
            actor_id: UserId::new("u1").unwrap(),
            actor_role: role,
            resource_id: "doc-1".into(),
            resource_class: class,
            action,
            ip: None,
            user_agent: None,
        }
    }

    #[tokio::test]
    async fn user_delete_on_system_resource_is_denied_with_matrix_reason() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());
        let result = engine
            .delete(request(Role::User, ResourceClass::System, AccessAction::Delete))
            .await;
        assert!(matches!(result, Err(TenantError::Auth(reason)) if reason == "matrix"));
    }

    #[tokio::test]
    async fn legal_hold_blocks_delete_even_when_matrix_allows() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());
        engine.place_legal_hold("doc-1", "pending litigation");
        let result = engine
            .delete(request(Role::User, ResourceClass::Own, AccessAction::Delete))
            .await;
        assert!(matches!(result, Err(TenantError::Auth(reason)) if reason == "legal_hold"));
    }

    #[tokio::test]
    async fn write_then_overwrite_emits_added_then_processed() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());
        let req = AccessRequest {
            resource_id: "docs/a.txt".into(),
            ..request(Role::User, ResourceClass::Own, AccessAction::Write)
        };
        engine
            .write(req.clone(), b"v1", "docs", "a.txt", None)
            .await
            .unwrap();
        engine
            .write(req, b"v2", "docs", "a.txt", None)
            .await
            .unwrap();
    }
}
