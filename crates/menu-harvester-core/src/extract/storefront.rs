use serde_json::{Map, Value};

use super::{array_field, int_field, non_empty, text_field, ExtractContext};
use crate::image_url::{remove_size_params, strip_query};
use crate::types::StoreRecord;

pub const UNKNOWN_STORE_NAME: &str = "未知店铺";
pub const UNKNOWN_STORE_ID: &str = "unknown";

/// Content entry type carrying an embedded picture payload
const PICTURE_CONTENT_TYPE: i64 = 6;
const PICTURE_CONTENT_TITLE: &str = "图片";

/// Posters for the fan group are not storefront artwork
const FAN_GROUP_POSTER: &str = "fans_group_poster";

static EMPTY: Value = Value::Null;

/// Extract the storefront record from a `poi_info` / `poi_base_info` payload.
///
/// Matches whenever the payload has a `data` object; every field inside it
/// falls back to a default.
pub fn extract_storefront(doc: &Value, ctx: &ExtractContext) -> Option<StoreRecord> {
    let data = doc.get("data").filter(|d| d.is_object())?;

    let poi = poi_info(data);

    let name = non_empty(text_field(poi, "name")).unwrap_or_else(|| UNKNOWN_STORE_NAME.to_string());
    let id = non_empty(text_field(poi, "poi_id_str")).unwrap_or_else(|| UNKNOWN_STORE_ID.to_string());

    let avatar_url = non_empty(remove_size_params(&text_field(poi, "pic_url")));

    let header = non_empty(text_field(poi, "head_pic_url")).or_else(|| header_from_content(data));
    let header_url = header.and_then(|url| non_empty(remove_size_params(&url)));

    let poster_urls = poster_urls(data);

    Some(StoreRecord {
        name,
        id,
        avatar_url,
        header_url,
        poster_urls: if poster_urls.is_empty() {
            None
        } else {
            Some(poster_urls)
        },
        update_time: ctx.now,
    })
}

/// `poi_info` unless it is missing or an empty object, then `poi_base_info`
fn poi_info(data: &Value) -> &Value {
    let non_empty_object = |v: &&Value| v.as_object().is_some_and(|m: &Map<String, Value>| !m.is_empty());

    data.get("poi_info")
        .filter(non_empty_object)
        .or_else(|| data.get("poi_base_info").filter(|v| v.is_object()))
        .unwrap_or(&EMPTY)
}

/// Look for the first picture entry in `content_area_info.content_list` and
/// read `pic_url` out of its embedded JSON string.
fn header_from_content(data: &Value) -> Option<String> {
    let content_area = data.get("content_area_info")?;

    let entry = array_field(content_area, "content_list").iter().find(|content| {
        int_field(content, "content_type") == Some(PICTURE_CONTENT_TYPE)
            && text_field(content, "content_title") == PICTURE_CONTENT_TITLE
    })?;

    let embedded = array_field(entry, "content_data_list").first()?.as_str()?;

    // Malformed embedded payloads are ignored
    let picture: Value = match serde_json::from_str(embedded) {
        Ok(picture) => picture,
        Err(e) => {
            log::debug!("Ignoring malformed header picture payload: {}", e);
            return None;
        }
    };

    non_empty(text_field(&picture, "pic_url"))
}

fn poster_urls(data: &Value) -> Vec<String> {
    let Some(operations) = data.get("container_operation_source") else {
        return Vec::new();
    };

    array_field(operations, "operation_source_list")
        .iter()
        .map(|item| text_field(item, "pic_url"))
        .filter(|url| !url.is_empty() && !url.contains(FAN_GROUP_POSTER))
        .map(|url| strip_query(&url).to_string())
        .collect()
}
