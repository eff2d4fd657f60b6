use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Free-form contents of a bag
pub type BagContents = Map<String, Value>;

/// A bag as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BagRecord {
    pub id: Uuid,
    pub contents: BagContents,
    pub user_id: Uuid,
}

/// Response body for listing a user's bags
#[derive(Debug, Serialize, Deserialize)]
pub struct BagList {
    pub bags: Vec<BagRecord>,
}

/// Response body for a newly added bag
#[derive(Debug, Serialize, Deserialize)]
pub struct NewBag {
    pub id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bag_record_wire_format() {
        let id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let mut contents = BagContents::new();
        contents.insert("items".to_string(), json!(["/iplant/home/a.txt"]));

        let bag = BagRecord {
            id,
            contents,
            user_id,
        };

        assert_eq!(
            serde_json::to_value(&bag).unwrap(),
            json!({
                "id": id.to_string(),
                "contents": { "items": ["/iplant/home/a.txt"] },
                "user_id": user_id.to_string(),
            })
        );
    }
}
