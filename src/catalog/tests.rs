use super::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn image(file_name: &str) -> ImageFile {
    ImageFile {
        file_name: file_name.to_string(),
        path: PathBuf::from("public/images").join(file_name),
    }
}

#[test]
fn clean_name_replaces_separators_and_title_cases() {
    assert_eq!(clean_name("red_running-shoe.jpg"), "Red Running Shoe");
    assert_eq!(clean_name("blue__denim---jacket.PNG"), "Blue Denim Jacket");
    assert_eq!(clean_name("LEATHER_BAG.webp"), "Leather Bag");
    assert_eq!(clean_name("air-max90x.jpeg"), "Air Max90X");
}

#[test]
fn clean_name_trims_edge_separators() {
    assert_eq!(clean_name("_gold_watch_.jpg"), "Gold Watch");
    assert_eq!(clean_name("--hoodie.png"), "Hoodie");
    assert_eq!(clean_name("  summer top .jpg"), "Summer Top");
}

#[test]
fn clean_name_strips_only_final_extension() {
    assert_eq!(clean_name("v1.2_sneaker.jpg"), "V1.2 Sneaker");
    assert_eq!(clean_name("plain"), "Plain");
}

#[test]
fn clean_name_capitalises_only_first_letter_of_expansions() {
    assert_eq!(clean_name("ßport_bag.jpg"), "Ssport Bag");
    assert_eq!(clean_name("ﬁsh_top.png"), "Fish Top");

    for file_name in ["ßport_bag.jpg", "ﬁsh_top.png"] {
        let once = clean_name(file_name);
        assert_eq!(clean_name(&format!("{}.jpg", once)), once);
    }
}

#[test]
fn clean_name_keeps_leading_dots() {
    assert_eq!(clean_name("..jpg"), "..Jpg");
    assert_eq!(clean_name(".jpg"), ".Jpg");
    assert_eq!(clean_name(".hidden_bag.png"), ".Hidden Bag");
    assert_eq!(clean_name("trailing."), "Trailing");
}

#[test]
fn clean_name_is_idempotent() {
    let file_names = [
        "red_running-shoe.jpg",
        "blue__denim---jacket.PNG",
        "_gold_watch_.jpg",
        "air-max90x.jpeg",
        "men's_t-shirt.webp",
        "mixed CASE_name.png",
        "v1.2_sneaker.jpg",
        "ßport_bag.jpg",
        "ﬁsh_top.png",
        "..jpg",
    ];

    for file_name in file_names {
        let once = clean_name(file_name);
        let twice = clean_name(&format!("{}.jpg", once));
        assert_eq!(once, twice, "name derived from {} changed", file_name);
    }
}

#[test]
fn classify_each_category() {
    assert_eq!(Category::classify("Red Running Shoe"), Category::Footwear);
    assert_eq!(Category::classify("White Sneakers"), Category::Footwear);
    assert_eq!(Category::classify("Hiking Boots"), Category::Footwear);
    assert_eq!(Category::classify("Graphic Tshirt"), Category::Clothing);
    assert_eq!(Category::classify("Grey Hoodie"), Category::Clothing);
    assert_eq!(Category::classify("Tank Top"), Category::Clothing);
    assert_eq!(Category::classify("Travel Backpack"), Category::Accessories);
    assert_eq!(Category::classify("Evening Purse"), Category::Accessories);
    assert_eq!(Category::classify("Smart Watch"), Category::Jewelry);
    assert_eq!(Category::classify("Pearl Necklace"), Category::Jewelry);
    assert_eq!(Category::classify("Jewelry Box"), Category::Jewelry);
    assert_eq!(Category::classify("Ceramic Mug"), Category::General);
}

#[test]
fn classify_is_case_insensitive() {
    assert_eq!(Category::classify("SHOE"), Category::Footwear);
    assert_eq!(Category::classify("hOoDiE"), Category::Clothing);
}

#[test]
fn classify_follows_priority_order() {
    assert_eq!(Category::classify("Shoe Bag"), Category::Footwear);
    assert_eq!(Category::classify("Bag With Shoe Pocket"), Category::Footwear);
    assert_eq!(Category::classify("Shirt And Watch Set"), Category::Clothing);
    assert_eq!(Category::classify("Watch Bag"), Category::Accessories);
    // Substring search: "laptop" contains "top"
    assert_eq!(Category::classify("Laptop Sleeve"), Category::Clothing);
}

#[test]
fn unmatched_keywords_fall_back_to_general() {
    // Known gap in the keyword lists
    assert_eq!(Category::classify("Leather Sandal"), Category::General);
    assert_eq!(Category::classify(""), Category::General);
}

#[test]
fn category_serializes_as_name() {
    let json = serde_json::to_string(&Category::Accessories).expect("should serialize");
    assert_eq!(json, "\"Accessories\"");
    assert_eq!(Category::Jewelry.to_string(), "Jewelry");

    let parsed: Category = serde_json::from_str("\"Footwear\"").expect("should parse");
    assert_eq!(parsed, Category::Footwear);
}

#[test]
fn build_catalog_assigns_contiguous_ids() {
    let images = vec![
        image("a_shoe.jpg"),
        image("b_bag.png"),
        image("c_mug.webp"),
    ];

    let products = build_catalog(&images, "/images");

    let ids: Vec<u32> = products.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    assert_eq!(
        products[0],
        Product {
            id: 1,
            name: "A Shoe".to_string(),
            category: Category::Footwear,
            image: "/images/a_shoe.jpg".to_string(),
        }
    );
    assert_eq!(products[1].category, Category::Accessories);
    assert_eq!(products[2].category, Category::General);
    assert_eq!(products[2].image, "/images/c_mug.webp");
}

#[test]
fn build_catalog_of_nothing_is_empty() {
    assert!(build_catalog(&[], "/images").is_empty());
}

#[test]
fn products_file_layout() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let path = temp_dir.path().join("products.json");
    let products = build_catalog(&[image("gold_watch.jpg")], "/images");

    write_products(&path, &products).expect("should write products");

    let content = std::fs::read_to_string(&path).expect("should read products");
    let expected = r#"[
  {
    "id": 1,
    "name": "Gold Watch",
    "category": "Jewelry",
    "image": "/images/gold_watch.jpg"
  }
]"#;
    assert_eq!(content, expected);

    let loaded = read_products(&path).expect("should read products back");
    assert_eq!(loaded, products);
}
