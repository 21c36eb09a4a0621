//! GROQ queries.
//!
//! Parameters are bound as `$name` and sent JSON-encoded; optional filters
//! are sent as `null` so `defined($x)` is false.

/// Filtered product listing.
pub const PRODUCTS: &str = r#"*[_type == "product"
  && (!defined($variant) || lower(variant) == lower($variant))
  && (!defined($brand) || brand->slug.current == $brand)
  && (!defined($category) || $category in categories[]->slug.current)
  && price >= $min && price <= $max
] | order(name asc){
  ...,
  "categories": categories[]->title
}"#;

/// Typeahead search. `$term` carries a trailing `*` for prefix matching.
pub const SEARCH_PRODUCTS: &str = r#"*[_type == "product"
  && (name match $term || description match $term)
] | order(name asc)[0...20]{
  _id,
  name,
  slug,
  price,
  "images": images[0...1]
}"#;

/// Single product by slug.
pub const PRODUCT_BY_SLUG: &str = r#"*[_type == "product" && slug.current == $slug][0]{
  ...,
  "categories": categories[]->title
}"#;

/// A user's addresses, newest first.
pub const ADDRESSES_FOR_OWNER: &str =
    r#"*[_type == "address" && clerkUserId == $ownerId] | order(createdAt desc)"#;

/// Addresses currently flagged default for a user (patch target).
pub const DEFAULT_ADDRESSES_FOR_OWNER: &str =
    r#"*[_type == "address" && clerkUserId == $ownerId && default == true]"#;
