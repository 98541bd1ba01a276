//! Database Models

// Catalog
pub mod category;
pub mod dish;
pub mod legacy_product;
pub mod menu_item;

// Shopper
pub mod address;
pub mod cart;
pub mod wishlist;

// Checkout
pub mod discount;
pub mod order;

// Storefront extras
pub mod reservation;
pub mod review;

// System
pub mod settings;

// Re-exports
pub use address::{Address, AddressCreate, AddressUpdate};
pub use cart::{CartLine, CartLineCreate, CartLineUpdate, CartSnapshot, VariantSelection};
pub use category::{Category, CategoryCreate, CategoryUpdate};
pub use discount::{DiscountCode, DiscountCodeCreate, DiscountCodeUpdate, DiscountKind};
pub use dish::Dish;
pub use legacy_product::LegacyProduct;
pub use menu_item::{
    Combination, MenuItem, MenuItemCreate, MenuItemUpdate, Variant,
};
pub use order::{Order, OrderAddress, OrderLine, PaymentState};
pub use reservation::{Reservation, ReservationCreate, ReservationStatus};
pub use review::{RatingSummary, Review, ReviewCreate};
pub use settings::{StoreSettings, StoreSettingsUpdate};
pub use wishlist::WishlistEntry;
