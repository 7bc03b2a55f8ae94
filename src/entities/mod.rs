//! SeaORM entities for the storefront schema.

pub mod cart;
pub mod cart_item;
pub mod category;
pub mod discount_code;
pub mod inventory_log;
pub mod order;
pub mod order_item;
pub mod page_view;
pub mod product;
pub mod product_image;
pub mod product_model;
pub mod recently_viewed;
pub mod review;
pub mod session;
pub mod shipping_address;
pub mod user;
pub mod wishlist;
pub mod wishlist_item;

pub use cart::Entity as Cart;
pub use cart_item::Entity as CartItem;
pub use category::Entity as Category;
pub use discount_code::Entity as DiscountCode;
pub use inventory_log::Entity as InventoryLog;
pub use order::Entity as Order;
pub use order_item::Entity as OrderItem;
pub use page_view::Entity as PageView;
pub use product::Entity as Product;
pub use product_image::Entity as ProductImage;
pub use product_model::Entity as ProductModel;
pub use recently_viewed::Entity as RecentlyViewed;
pub use review::Entity as Review;
pub use session::Entity as Session;
pub use shipping_address::Entity as ShippingAddress;
pub use user::Entity as User;
pub use wishlist::Entity as Wishlist;
pub use wishlist_item::Entity as WishlistItem;
