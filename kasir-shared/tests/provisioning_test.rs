/// Provisioning sequence properties against the in-memory store

use futures::future::join_all;
use kasir_shared::models::role::Role;
use kasir_shared::provisioning::{
    provision_account, ProvisioningError, Step, DEFAULT_ORGANIZATION_NAME,
    DEFAULT_ORGANIZATION_SLUG,
};
use kasir_shared::store::memory::{FailPoint, MemoryStore};
use kasir_shared::store::Store;
use std::sync::Arc;

#[tokio::test]
async fn test_new_identity_on_empty_store() {
    let store = MemoryStore::new();

    let provisioned = provision_account(&store, "user_2abc").await.unwrap();

    assert!(provisioned.created);
    assert_eq!(store.organization_count().await, 1);
    assert_eq!(store.account_count().await, 1);
    assert_eq!(store.membership_count().await, 1);

    let organization = store
        .find_organization_by_slug(DEFAULT_ORGANIZATION_SLUG)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(organization.name, DEFAULT_ORGANIZATION_NAME);

    let account = provisioned.account;
    assert_eq!(account.organization_id, organization.id);
    assert_eq!(account.role, Role::Admin);

    let membership = store
        .find_membership(organization.id, account.id)
        .await
        .unwrap()
        .expect("membership should exist");
    assert_eq!(membership.role, Role::Admin);
}

#[tokio::test]
async fn test_existing_default_organization_is_reused() {
    let store = MemoryStore::new();
    provision_account(&store, "user_a").await.unwrap();
    let organization = store
        .find_organization_by_slug(DEFAULT_ORGANIZATION_SLUG)
        .await
        .unwrap()
        .unwrap();

    let provisioned = provision_account(&store, "user_b").await.unwrap();

    assert!(provisioned.created);
    assert_eq!(provisioned.account.organization_id, organization.id);
    assert_eq!(store.organization_count().await, 1);
    assert_eq!(store.account_count().await, 2);
    assert_eq!(store.membership_count().await, 2);
}

#[tokio::test]
async fn test_existing_identity_writes_nothing() {
    let store = MemoryStore::new();
    let first = provision_account(&store, "user_a").await.unwrap();

    // Any write would trip these.
    store.fail_next(FailPoint::OrganizationLookup).await;
    store.fail_next(FailPoint::OrganizationWrite).await;
    store.fail_next(FailPoint::AccountWrite).await;

    let second = provision_account(&store, "user_a").await.unwrap();

    assert!(!second.created);
    assert_eq!(second.account, first.account);
    assert_eq!(store.account_count().await, 1);
    assert_eq!(store.membership_count().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_distinct_identities_share_one_organization() {
    let store = Arc::new(MemoryStore::new());

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                provision_account(&*store, &format!("user_{}", i)).await
            })
        })
        .collect();

    let mut organization_ids = Vec::new();
    for handle in handles {
        let provisioned = handle.await.unwrap().unwrap();
        assert!(provisioned.created);
        organization_ids.push(provisioned.account.organization_id);
    }

    assert_eq!(store.organization_count().await, 1);
    assert_eq!(store.account_count().await, 16);
    assert_eq!(store.membership_count().await, 16);
    assert!(organization_ids.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test]
async fn test_concurrent_same_identity_creates_one_account() {
    let store = MemoryStore::new();

    let results = join_all((0..8).map(|_| provision_account(&store, "user_a"))).await;

    let accounts: Vec<_> = results.into_iter().map(|r| r.unwrap()).collect();
    assert_eq!(accounts.iter().filter(|p| p.created).count(), 1);
    assert!(accounts
        .iter()
        .all(|p| p.account.id == accounts[0].account.id));
    assert_eq!(store.account_count().await, 1);
    assert_eq!(store.membership_count().await, 1);
}

#[tokio::test]
async fn test_membership_failure_leaves_no_orphan_and_retry_succeeds() {
    let store = MemoryStore::new();
    store.fail_next(FailPoint::MembershipWrite).await;

    let err = provision_account(&store, "user_a").await.unwrap_err();

    assert!(matches!(
        err,
        ProvisioningError::Store {
            step: Step::WriteMembership,
            ..
        }
    ));
    assert_eq!(store.account_count().await, 0);
    assert_eq!(store.membership_count().await, 0);
    // The organization step had already succeeded.
    assert_eq!(store.organization_count().await, 1);

    let retried = provision_account(&store, "user_a").await.unwrap();

    assert!(retried.created);
    assert_eq!(store.account_count().await, 1);
    assert_eq!(store.membership_count().await, 1);
    assert!(store
        .find_membership(retried.account.organization_id, retried.account.id)
        .await
        .unwrap()
        .is_some());
}
