use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    catalog::{BookResolver, OpenLibraryGateway},
    config::Config,
    db::Cache,
    push::PushRegistry,
    services::{
        books::CatalogService,
        comments::CommentService,
        dashboard::RecommendationEngine,
        feed::FeedService,
        history::{HistoryStore, InMemoryHistoryStore},
        notifications::NotificationDispatcher,
        reviews::ReviewService,
        social::SocialService,
        users::UserService,
    },
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub resolver: BookResolver,
    pub reviews: Arc<ReviewService>,
    pub comments: Arc<CommentService>,
    pub social: Arc<SocialService>,
    pub users: Arc<UserService>,
    pub catalog: Arc<CatalogService>,
    pub engine: Arc<RecommendationEngine>,
    pub feed: Arc<FeedService>,
    pub notifications: Arc<NotificationDispatcher>,
    pub push: Arc<PushRegistry>,
}

impl AppState {
    /// Wires the service graph: gateway and push registry are shared, the
    /// notification dispatcher feeds every social service, and the
    /// recommendation engine gets the in-memory history store.
    pub fn new(pool: PgPool, cache: Cache, config: &Config) -> Self {
        let gateway = Arc::new(OpenLibraryGateway::new(
            cache,
            config.catalog_api_url.clone(),
            config.catalog_covers_url.clone(),
        ));
        let push = Arc::new(PushRegistry::new());
        let notifications = Arc::new(NotificationDispatcher::new(pool.clone(), Arc::clone(&push)));
        let history: Arc<dyn HistoryStore> = Arc::new(InMemoryHistoryStore::new());

        let resolver = BookResolver::with_default_chain(pool.clone(), Arc::clone(&gateway));

        Self {
            reviews: Arc::new(ReviewService::new(
                pool.clone(),
                resolver.clone(),
                Arc::clone(&notifications),
            )),
            comments: Arc::new(CommentService::new(pool.clone(), Arc::clone(&notifications))),
            social: Arc::new(SocialService::new(pool.clone(), Arc::clone(&notifications))),
            users: Arc::new(UserService::new(pool.clone())),
            catalog: Arc::new(CatalogService::new(pool.clone(), Arc::clone(&gateway))),
            engine: Arc::new(RecommendationEngine::new(
                pool.clone(),
                Arc::clone(&gateway),
                history,
            )),
            feed: Arc::new(FeedService::new(pool)),
            resolver,
            notifications,
            push,
        }
    }
}
