//! Product Resolver
//!
//! 把购物车行解析为统一的 [`ResolvedProduct`] 视图。
//! 输出与输入等长，任何一行都不会被静默丢弃。
//!
//! # 回退链
//!
//! 每行按序尝试，取第一个命中的策略：
//!
//! 1. 会话缓存的既有解析结果
//! 2. 按 [`ProductRef`] 标签分发的权威表查询
//! 3. 加购时捕获的内嵌快照
//! 4. 由行自身字段合成的占位商品
//!
//! 权威记录被删除或外键断裂时结账仍然可用 ——
//! 这是刻意的韧性策略，不是需要中止的错误条件。
//! 查询失败从不向上抛，只产生降级结果。

use dashmap::DashMap;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use shared::checkout::{ProductRef, ResolvedProduct, ResolvedSource};
use shared::models::{CartLine, VariantSelection};

use crate::db::repository::{DishRepository, LegacyProductRepository, MenuItemRepository};

/// 会话级解析缓存，键为购物车行 ID
///
/// 实时监听器收到相关变更时按行失效。
pub type ResolutionCache = DashMap<String, ResolvedProduct>;

/// 三张后备商品表的统一查询入口
#[derive(Clone)]
pub struct Catalog {
    menu_items: MenuItemRepository,
    dishes: DishRepository,
    legacy: LegacyProductRepository,
}

impl Catalog {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            menu_items: MenuItemRepository::new(db.clone()),
            dishes: DishRepository::new(db.clone()),
            legacy: LegacyProductRepository::new(db),
        }
    }

    /// 权威查询：按标签分发到对应表
    ///
    /// 返回 None 表示记录缺失或查询失败 (降级到下一环，不报错)。
    async fn authoritative(
        &self,
        product_ref: &ProductRef,
        selection: Option<&VariantSelection>,
    ) -> Option<ResolvedProduct> {
        match product_ref {
            ProductRef::MenuItem(id) => {
                let item = self
                    .menu_items
                    .find_by_id(id)
                    .await
                    .unwrap_or_else(|e| {
                        tracing::debug!(id = %id, error = %e, "Menu item lookup failed, degrading");
                        None
                    })?;

                // 选中规格/组合时以其价格与展示名为准
                let (price, variant_name) = match selection {
                    Some(VariantSelection::Variant(vid)) => match item.variant(vid) {
                        Some(v) => (v.price, Some(v.name.clone())),
                        None => (item.price, None),
                    },
                    Some(VariantSelection::Combination(cid)) => match item.combination(cid) {
                        Some(c) => (c.price, Some(c.name.clone())),
                        None => (item.price, None),
                    },
                    None => (item.price, None),
                };

                Some(ResolvedProduct {
                    id: item.id.unwrap_or_else(|| id.clone()),
                    name: item.name,
                    current_price: price,
                    available: item.is_available && item.is_active,
                    image: item.image,
                    variant_name,
                    source: ResolvedSource::MenuItem,
                })
            }
            ProductRef::Dish(id) => {
                let dish = self
                    .dishes
                    .find_by_id(id)
                    .await
                    .unwrap_or_else(|e| {
                        tracing::debug!(id = %id, error = %e, "Dish lookup failed, degrading");
                        None
                    })?;
                Some(ResolvedProduct {
                    id: dish.id.unwrap_or_else(|| id.clone()),
                    name: dish.name,
                    current_price: dish.price,
                    available: dish.available,
                    image: dish.image,
                    variant_name: None,
                    source: ResolvedSource::Dish,
                })
            }
            ProductRef::Legacy(id) => {
                let product = self
                    .legacy
                    .find_by_id(id)
                    .await
                    .unwrap_or_else(|e| {
                        tracing::debug!(id = %id, error = %e, "Legacy product lookup failed, degrading");
                        None
                    })?;
                Some(ResolvedProduct {
                    id: product.id.unwrap_or_else(|| id.clone()),
                    name: product.title,
                    current_price: product.unit_price,
                    available: product.in_stock > 0,
                    image: product.photo,
                    variant_name: None,
                    source: ResolvedSource::Legacy,
                })
            }
        }
    }
}

/// 解析一组购物车行
///
/// 契约：输出长度恒等于输入长度，每行取回退链的第一个命中。
/// 纯读操作，命中的权威解析会写入缓存。
pub async fn resolve_lines(
    catalog: &Catalog,
    lines: &[CartLine],
    cache: &ResolutionCache,
) -> Vec<ResolvedProduct> {
    let mut resolved = Vec::with_capacity(lines.len());
    for line in lines {
        resolved.push(resolve_line(catalog, line, cache).await);
    }
    resolved
}

async fn resolve_line(
    catalog: &Catalog,
    line: &CartLine,
    cache: &ResolutionCache,
) -> ResolvedProduct {
    // 1. 会话缓存
    if let Some(id) = &line.id
        && let Some(cached) = cache.get(id)
    {
        return cached.clone();
    }

    // 2. 权威查询
    if let Some(product) = catalog
        .authoritative(&line.product_ref, line.selection.as_ref())
        .await
    {
        if let Some(id) = &line.id {
            cache.insert(id.clone(), product.clone());
        }
        return product;
    }

    // 3. 内嵌快照
    if let Some(snapshot) = &line.snapshot {
        return ResolvedProduct {
            id: line.product_ref.id().to_string(),
            name: snapshot.name.clone(),
            current_price: snapshot.price,
            available: true,
            image: snapshot.image.clone(),
            variant_name: snapshot.variant_name.clone(),
            source: ResolvedSource::Snapshot,
        };
    }

    // 4. 占位商品：行上有什么用什么
    ResolvedProduct {
        id: line.product_ref.id().to_string(),
        name: line.product_ref.id().to_string(),
        current_price: line.price_at_add.unwrap_or(0.0),
        available: false,
        image: None,
        variant_name: None,
        source: ResolvedSource::Placeholder,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use shared::models::{CartSnapshot, MenuItemCreate, Variant};

    fn make_line(product_ref: ProductRef) -> CartLine {
        CartLine {
            id: None,
            owner: "guest:t".to_string(),
            product_ref,
            quantity: 1,
            selection: None,
            price_at_add: None,
            snapshot: None,
            added_at: 0,
        }
    }

    async fn seed_item(db: &Surreal<Db>, name: &str, price: f64) -> String {
        let repo = MenuItemRepository::new(db.clone());
        let item = repo
            .create(MenuItemCreate {
                name: name.to_string(),
                description: None,
                image: None,
                category: "category:main".to_string(),
                price,
                sort_order: None,
                variants: None,
                combinations: None,
            })
            .await
            .unwrap();
        item.id.unwrap()
    }

    #[tokio::test]
    async fn test_resolves_authoritative_menu_item() {
        let svc = DbService::new_in_memory().await.unwrap();
        let catalog = Catalog::new(svc.db.clone());
        let id = seed_item(&svc.db, "Margherita Pizza", 450.0).await;

        let cache = ResolutionCache::new();
        let lines = vec![make_line(ProductRef::MenuItem(id))];
        let resolved = resolve_lines(&catalog, &lines, &cache).await;

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].name, "Margherita Pizza");
        assert_eq!(resolved[0].current_price, 450.0);
        assert!(resolved[0].available);
        assert_eq!(resolved[0].source, ResolvedSource::MenuItem);
    }

    #[tokio::test]
    async fn test_variant_selection_overrides_price() {
        let svc = DbService::new_in_memory().await.unwrap();
        let repo = MenuItemRepository::new(svc.db.clone());
        let item = repo
            .create(MenuItemCreate {
                name: "Pizza".to_string(),
                description: None,
                image: None,
                category: "category:main".to_string(),
                price: 450.0,
                sort_order: None,
                variants: Some(vec![
                    Variant { id: "s".into(), name: "Small".into(), price: 450.0, is_default: true },
                    Variant { id: "l".into(), name: "Large".into(), price: 620.0, is_default: false },
                ]),
                combinations: None,
            })
            .await
            .unwrap();

        let catalog = Catalog::new(svc.db.clone());
        let mut line = make_line(ProductRef::MenuItem(item.id.unwrap()));
        line.selection = Some(VariantSelection::Variant("l".into()));

        let cache = ResolutionCache::new();
        let resolved = resolve_lines(&catalog, &[line], &cache).await;
        assert_eq!(resolved[0].current_price, 620.0);
        assert_eq!(resolved[0].variant_name.as_deref(), Some("Large"));
    }

    #[tokio::test]
    async fn test_missing_record_falls_back_to_snapshot() {
        let svc = DbService::new_in_memory().await.unwrap();
        let catalog = Catalog::new(svc.db.clone());

        let mut line = make_line(ProductRef::MenuItem("menu_item:gone".to_string()));
        line.snapshot = Some(CartSnapshot {
            name: "Deleted Pizza".to_string(),
            price: 390.0,
            image: None,
            variant_name: None,
        });

        let cache = ResolutionCache::new();
        let resolved = resolve_lines(&catalog, &[line], &cache).await;
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].name, "Deleted Pizza");
        assert_eq!(resolved[0].current_price, 390.0);
        assert_eq!(resolved[0].source, ResolvedSource::Snapshot);
    }

    #[tokio::test]
    async fn test_missing_record_without_snapshot_yields_placeholder() {
        let svc = DbService::new_in_memory().await.unwrap();
        let catalog = Catalog::new(svc.db.clone());

        let mut line = make_line(ProductRef::Dish("dish:gone".to_string()));
        line.price_at_add = Some(120.0);

        let cache = ResolutionCache::new();
        let resolved = resolve_lines(&catalog, &[line], &cache).await;
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].current_price, 120.0);
        assert!(!resolved[0].available);
        assert_eq!(resolved[0].source, ResolvedSource::Placeholder);
    }

    #[tokio::test]
    async fn test_no_line_dropped_across_mixed_outcomes() {
        let svc = DbService::new_in_memory().await.unwrap();
        let catalog = Catalog::new(svc.db.clone());
        let found = seed_item(&svc.db, "Found", 100.0).await;

        let mut snapshot_line = make_line(ProductRef::MenuItem("menu_item:x".to_string()));
        snapshot_line.snapshot = Some(CartSnapshot {
            name: "Snap".to_string(),
            price: 50.0,
            image: None,
            variant_name: None,
        });

        let lines = vec![
            make_line(ProductRef::MenuItem(found)),
            snapshot_line,
            make_line(ProductRef::Legacy("legacy_product:y".to_string())),
        ];

        let cache = ResolutionCache::new();
        let resolved = resolve_lines(&catalog, &lines, &cache).await;
        assert_eq!(resolved.len(), lines.len());
        assert_eq!(resolved[0].source, ResolvedSource::MenuItem);
        assert_eq!(resolved[1].source, ResolvedSource::Snapshot);
        assert_eq!(resolved[2].source, ResolvedSource::Placeholder);
    }

    #[tokio::test]
    async fn test_cache_wins_over_authoritative() {
        let svc = DbService::new_in_memory().await.unwrap();
        let catalog = Catalog::new(svc.db.clone());
        let id = seed_item(&svc.db, "Fresh", 100.0).await;

        let mut line = make_line(ProductRef::MenuItem(id));
        line.id = Some("cart_line:test".to_string());
        let cache = ResolutionCache::new();
        cache.insert(
            "cart_line:test".to_string(),
            ResolvedProduct {
                id: "menu_item:cached".to_string(),
                name: "Cached".to_string(),
                current_price: 77.0,
                available: true,
                image: None,
                variant_name: None,
                source: ResolvedSource::MenuItem,
            },
        );

        let resolved = resolve_lines(&catalog, &[line], &cache).await;
        assert_eq!(resolved[0].name, "Cached");
        assert_eq!(resolved[0].current_price, 77.0);
    }
}
