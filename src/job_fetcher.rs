// src/job_fetcher.rs
//
// The two GraphQL operations (search, details) and the raw-to-domain
// decoding. Absent fields always fall back to a fixed default; decoding
// never fails a whole response.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::graphql_client::{GraphQlClient, GraphQlRequest};
use crate::models::{Activity, BidStats, Budget, ClientInfo, ClientStats, Job, JobDetails};
use crate::store::Storage;

pub const SEARCH_ALIAS: &str = "userJobSearch";
pub const DETAILS_ALIAS: &str = "gql-query-get-auth-job-details";

const SEARCH_QUERY: &str = r#"
query UserJobSearch($req: UserJobSearchV1Request!) {
  search { universalSearchNuxt { userJobSearchV1(request: $req) {
    results {
      id
      title
      description
      relevanceEncoded
      applied
      ontologySkills { uid prefLabel prettyName: prefLabel }
      jobTile { job { id ciphertext: cipherText publishTime createTime jobType hourlyBudgetMin hourlyBudgetMax fixedPriceAmount { amount isoCurrencyCode } } }
      upworkHistoryData { client { paymentVerificationStatus country totalSpent { amount } totalFeedback } }
    }
  }}}
}"#;

const DETAILS_QUERY: &str = r#"
query JobAuthDetailsQuery($id: ID!) {
  jobAuthDetails(id: $id) {
    opening {
      job {
        description
        clientActivity {
          lastBuyerActivity
          totalApplicants
          totalHired
          totalInvitedToInterview
          invitationsSent
          numberOfPositionsToHire
        }
      }
      questions { question }
    }
    buyer {
      info {
        stats {
          totalAssignments
          totalJobsWithHires
          activeAssignmentsCount
          hoursCount
          feedbackCount
          score
          totalCharges { amount }
        }
      }
    }
    applicantsBidsStats {
      avgRateBid { amount }
      minRateBid { amount }
      maxRateBid { amount }
    }
  }
}"#;

// Money and counters show up as numbers or numeric strings.
fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<f64>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.as_ref().and_then(number))
}

fn lenient_u64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<u64>, D::Error> {
    Ok(lenient_f64(d)?.filter(|v| *v >= 0.0).map(|v| v as u64))
}

fn number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// `{ "amount": .. }` objects, occasionally flattened to the bare amount.
fn lenient_money<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<f64>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Object(m)) => m.get("amount").and_then(number),
        Some(v) => number(&v),
        None => None,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// A nested object of the wrong shape decodes as absent instead of failing
/// its parent.
fn tolerant<'de, D, T>(d: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(Option::<Value>::deserialize(d)?.and_then(|v| T::deserialize(v).ok()))
}

// Skill entries are objects with labels; bare strings are taken as the label.
fn lenient_skills<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<Vec<String>>, D::Error> {
    let Some(Value::Array(items)) = Option::<Value>::deserialize(d)? else {
        return Ok(None);
    };
    Ok(Some(
        items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Object(m) => ["prettyName", "prefLabel"]
                    .iter()
                    .find_map(|k| m.get(*k).and_then(Value::as_str).map(str::to_string)),
                _ => None,
            })
            .collect(),
    ))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawTileJob {
    #[serde(deserialize_with = "lenient_string")]
    ciphertext: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    publish_time: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    create_time: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    job_type: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    hourly_budget_min: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    hourly_budget_max: Option<f64>,
    #[serde(deserialize_with = "lenient_money")]
    fixed_price_amount: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawJobTile {
    #[serde(deserialize_with = "tolerant")]
    job: Option<RawTileJob>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawClient {
    #[serde(deserialize_with = "lenient_string")]
    payment_verification_status: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    country: Option<String>,
    #[serde(deserialize_with = "lenient_money")]
    total_spent: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    total_feedback: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawHistory {
    #[serde(deserialize_with = "tolerant")]
    client: Option<RawClient>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawSearchResult {
    #[serde(deserialize_with = "lenient_string")]
    title: Option<String>,
    #[serde(deserialize_with = "lenient_skills")]
    ontology_skills: Option<Vec<String>>,
    #[serde(deserialize_with = "tolerant")]
    job_tile: Option<RawJobTile>,
    #[serde(deserialize_with = "tolerant")]
    upwork_history_data: Option<RawHistory>,
}

fn money(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("${amount:.0}")
    } else {
        format!("${amount:.2}")
    }
}

fn budget_amount(job: &RawTileJob) -> String {
    // a zero fixed price is still a fixed price; hourly tiles may carry a
    // placeholder amount
    match job.fixed_price_amount {
        Some(fixed) if job.job_type.as_deref() != Some("HOURLY") => return money(fixed),
        _ => {}
    }
    match (job.hourly_budget_min.filter(|v| *v > 0.0), job.hourly_budget_max.filter(|v| *v > 0.0)) {
        (Some(min), Some(max)) => format!("{}-{}/hr", money(min), money(max)),
        (Some(min), None) => format!("{}+/hr", money(min)),
        _ => "Hourly".to_string(),
    }
}

/// `None` when the result carries no cipher text, i.e. no stable id.
fn decode_job(raw: RawSearchResult, job_url_base: &str) -> Option<Job> {
    let tile = raw.job_tile.and_then(|t| t.job).unwrap_or_default();
    let id = tile.ciphertext.clone().filter(|c| !c.is_empty())?;
    let client = raw.upwork_history_data.and_then(|h| h.client).unwrap_or_default();

    Some(Job {
        url: format!("{}/{}", job_url_base.trim_end_matches('/'), id),
        title: raw.title.unwrap_or_else(|| "N/A".to_string()),
        posted_on: tile
            .publish_time
            .clone()
            .or_else(|| tile.create_time.clone())
            .unwrap_or_else(|| "N/A".to_string()),
        budget: Budget {
            kind: tile.job_type.clone().unwrap_or_else(|| "N/A".to_string()),
            amount: budget_amount(&tile),
        },
        client: ClientInfo {
            country: client.country.filter(|c| !c.is_empty()).unwrap_or_else(|| "N/A".to_string()),
            rating: client.total_feedback.filter(|r| *r > 0.0),
            total_spent: client.total_spent.unwrap_or(0.0),
            payment_verified: client.payment_verification_status.as_deref() == Some("VERIFIED"),
        },
        skills: raw.ontology_skills.unwrap_or_default(),
        id,
        is_excluded: false,
        is_low_priority: false,
        priority_reason: None,
    })
}

/// Maps a search response body to jobs. A body without a results array
/// decodes to an empty list.
pub fn decode_search(body: &Value, job_url_base: &str) -> Vec<Job> {
    let Some(results) = body
        .pointer("/data/search/universalSearchNuxt/userJobSearchV1/results")
        .and_then(Value::as_array)
    else {
        warn!("No job results found in API response");
        return Vec::new();
    };

    results
        .iter()
        .filter_map(|item| match RawSearchResult::deserialize(item) {
            Ok(raw) => decode_job(raw, job_url_base).or_else(|| {
                warn!("Skipping search result without a job cipher text");
                None
            }),
            Err(e) => {
                warn!("Skipping malformed search result: {e}");
                None
            }
        })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawClientActivity {
    #[serde(deserialize_with = "lenient_string")]
    last_buyer_activity: Option<String>,
    #[serde(deserialize_with = "lenient_u64")]
    total_applicants: Option<u64>,
    #[serde(deserialize_with = "lenient_u64")]
    total_invited_to_interview: Option<u64>,
    #[serde(deserialize_with = "lenient_u64")]
    invitations_sent: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawOpeningJob {
    #[serde(deserialize_with = "lenient_string")]
    description: Option<String>,
    #[serde(deserialize_with = "tolerant")]
    client_activity: Option<RawClientActivity>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawOpening {
    #[serde(deserialize_with = "tolerant")]
    job: Option<RawOpeningJob>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawBuyerStats {
    #[serde(deserialize_with = "lenient_u64")]
    total_assignments: Option<u64>,
    #[serde(deserialize_with = "lenient_u64")]
    total_jobs_with_hires: Option<u64>,
    #[serde(deserialize_with = "lenient_u64")]
    active_assignments_count: Option<u64>,
    #[serde(deserialize_with = "lenient_u64")]
    feedback_count: Option<u64>,
    #[serde(deserialize_with = "lenient_f64")]
    score: Option<f64>,
    #[serde(deserialize_with = "lenient_money")]
    total_charges: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawBuyerInfo {
    #[serde(deserialize_with = "tolerant")]
    stats: Option<RawBuyerStats>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawBuyer {
    #[serde(deserialize_with = "tolerant")]
    info: Option<RawBuyerInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawBidStats {
    #[serde(deserialize_with = "lenient_money")]
    avg_rate_bid: Option<f64>,
    #[serde(deserialize_with = "lenient_money")]
    min_rate_bid: Option<f64>,
    #[serde(deserialize_with = "lenient_money")]
    max_rate_bid: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawJobDetails {
    #[serde(deserialize_with = "tolerant")]
    opening: Option<RawOpening>,
    #[serde(deserialize_with = "tolerant")]
    buyer: Option<RawBuyer>,
    #[serde(deserialize_with = "tolerant")]
    applicants_bids_stats: Option<RawBidStats>,
}

/// Merges the details response onto an already known job.
pub fn decode_details(body: &Value, job: Job) -> JobDetails {
    let raw = match body.pointer("/data/jobAuthDetails") {
        Some(v) if !v.is_null() => RawJobDetails::deserialize(v).unwrap_or_else(|e| {
            warn!("Malformed job details for {}: {e}", job.id);
            RawJobDetails::default()
        }),
        _ => {
            warn!("No job details found in API response for {}", job.id);
            RawJobDetails::default()
        }
    };

    let opening = raw.opening.and_then(|o| o.job).unwrap_or_default();
    let activity = opening.client_activity.unwrap_or_default();
    let stats = raw.buyer.and_then(|b| b.info).and_then(|i| i.stats).unwrap_or_default();

    let bid_stats = raw.applicants_bids_stats.and_then(|bids| {
        Some(BidStats {
            avg: bids.avg_rate_bid?,
            min: bids.min_rate_bid.unwrap_or(0.0),
            max: bids.max_rate_bid.unwrap_or(0.0),
        })
    });

    JobDetails {
        job,
        description: opening.description.filter(|d| !d.is_empty()).unwrap_or_else(|| "No description.".to_string()),
        client_stats: ClientStats {
            jobs_posted: stats.total_assignments.unwrap_or(0),
            total_hires: stats.total_jobs_with_hires.unwrap_or(0),
            active_contracts: stats.active_assignments_count.unwrap_or(0),
            total_spent: stats.total_charges.unwrap_or(0.0),
            feedback_score: stats.score.unwrap_or(0.0),
            feedback_count: stats.feedback_count.unwrap_or(0),
        },
        activity: Activity {
            applicants: activity.total_applicants.unwrap_or(0),
            interviewing: activity.total_invited_to_interview.unwrap_or(0),
            invites_sent: activity.invitations_sent.unwrap_or(0),
            last_viewed: activity.last_buyer_activity,
        },
        bid_stats,
    }
}

#[derive(Clone)]
pub struct JobFetcher {
    client: GraphQlClient,
    storage: Storage,
    default_query: String,
    page_size: u32,
    job_url_base: String,
}

impl JobFetcher {
    pub fn new(
        client: GraphQlClient,
        storage: Storage,
        default_query: String,
        page_size: u32,
        job_url_base: String,
    ) -> Self {
        Self { client, storage, default_query, page_size, job_url_base }
    }

    pub fn search_request(&self, user_query: &str) -> GraphQlRequest {
        let query = user_query.trim();
        let query = if query.is_empty() { self.default_query.as_str() } else { query };
        GraphQlRequest {
            query: SEARCH_QUERY.to_string(),
            variables: json!({
                "req": {
                    "userQuery": query,
                    "contractorTier": ["IntermediateLevel", "ExpertLevel"],
                    "sort": "recency",
                    "paging": { "offset": 0, "count": self.page_size },
                }
            }),
        }
    }

    pub async fn search(&self, user_query: &str) -> Result<Vec<Job>> {
        let request = self.search_request(user_query);
        let body = self.client.execute(SEARCH_ALIAS, &request).await?;
        let jobs = decode_search(&body, &self.job_url_base);
        info!("Fetched {} jobs", jobs.len());
        Ok(jobs)
    }

    /// Only jobs present in the stored recent-jobs snapshot can be
    /// inspected; anything else fails before touching the network.
    pub async fn details(&self, job_id: &str) -> Result<JobDetails> {
        let job = self
            .storage
            .recent_jobs()
            .await?
            .into_iter()
            .find(|j| j.id == job_id)
            .ok_or_else(|| Error::JobNotFound(job_id.to_string()))?;

        let request = GraphQlRequest {
            query: DETAILS_QUERY.to_string(),
            variables: json!({ "id": job_id, "isLoggedIn": true }),
        };
        let body = self.client.execute(DETAILS_ALIAS, &request).await?;
        Ok(decode_details(&body, job))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cookies::StaticCookieSource;
    use crate::credentials::{CredentialDiscovery, DiscoveryRules};
    use crate::graphql_client::Backoff;
    use httpmock::prelude::*;
    use std::sync::Arc;
    use std::time::Duration;

    pub(crate) fn raw_result(cipher: &str, title: &str, country: &str) -> Value {
        json!({
            "id": "1",
            "title": title,
            "ontologySkills": [{ "uid": "1", "prefLabel": "Rust", "prettyName": "Rust" }],
            "jobTile": { "job": {
                "id": "1",
                "ciphertext": cipher,
                "publishTime": "2024-05-01T10:00:00Z",
                "jobType": "FIXED",
                "fixedPriceAmount": { "amount": "250.0", "isoCurrencyCode": "USD" }
            }},
            "upworkHistoryData": { "client": {
                "paymentVerificationStatus": "VERIFIED",
                "country": country,
                "totalSpent": { "amount": 15000 },
                "totalFeedback": 4.95
            }}
        })
    }

    pub(crate) fn search_body(results: Vec<Value>) -> Value {
        json!({ "data": { "search": { "universalSearchNuxt": { "userJobSearchV1": { "results": results } } } } })
    }

    fn fetcher(server: &MockServer, storage: &Storage) -> JobFetcher {
        let discovery = CredentialDiscovery::new(Arc::new(StaticCookieSource::default()), DiscoveryRules::default());
        let client = GraphQlClient::new(
            server.url("/graphql"),
            Duration::from_secs(5),
            storage.clone(),
            discovery,
            Backoff::none(),
        )
        .unwrap();
        JobFetcher::new(client, storage.clone(), "rust".into(), 10, "https://www.upwork.com/jobs".into())
    }

    #[test]
    fn decodes_a_full_search_result() {
        let jobs = decode_search(&search_body(vec![raw_result("~01abc", "Rust backend", "Germany")]), "https://x.test/jobs/");
        assert_eq!(jobs.len(), 1);
        let job = &jobs[0];
        assert_eq!(job.id, "~01abc");
        assert_eq!(job.url, "https://x.test/jobs/~01abc");
        assert_eq!(job.posted_on, "2024-05-01T10:00:00Z");
        assert_eq!(job.budget, Budget { kind: "FIXED".into(), amount: "$250".into() });
        assert_eq!(job.client.rating, Some(4.95));
        assert_eq!(job.client.total_spent, 15000.0);
        assert!(job.client.payment_verified);
        assert_eq!(job.skills, vec!["Rust"]);
    }

    #[test]
    fn sparse_result_degrades_to_defaults() {
        let sparse = json!({ "title": "Bare", "jobTile": { "job": { "ciphertext": "~02", "jobType": "HOURLY", "hourlyBudgetMin": 30, "hourlyBudgetMax": "60" } }, "upworkHistoryData": null });
        let jobs = decode_search(&search_body(vec![sparse]), "https://x.test/jobs");
        let job = &jobs[0];
        assert_eq!(job.posted_on, "N/A");
        assert_eq!(job.budget.amount, "$30-$60/hr");
        assert_eq!(job.client.country, "N/A");
        assert_eq!(job.client.rating, None);
        assert_eq!(job.client.total_spent, 0.0);
        assert!(!job.client.payment_verified);
        assert!(job.skills.is_empty());
    }

    #[test]
    fn wrongly_shaped_fields_default_without_dropping_the_job() {
        let mut result = raw_result("~01", "Rust", "US");
        result["ontologySkills"] = json!(["Rust", 7, { "prefLabel": "Tokio" }]);
        result["upworkHistoryData"]["client"]["totalSpent"] = json!(15000);
        result["upworkHistoryData"]["client"]["country"] = json!({ "name": "US" });
        result["jobTile"]["job"]["publishTime"] = json!(1714557600000u64);

        let jobs = decode_search(&search_body(vec![result]), "https://x.test/jobs");

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].skills, vec!["Rust", "Tokio"]);
        assert_eq!(jobs[0].client.total_spent, 15000.0);
        assert_eq!(jobs[0].client.country, "N/A");
        assert_eq!(jobs[0].posted_on, "1714557600000");
    }

    #[test]
    fn wrongly_shaped_nested_object_is_treated_as_absent() {
        let mut result = raw_result("~01", "Rust", "US");
        result["upworkHistoryData"] = json!("redacted");
        result["title"] = Value::Null;

        let jobs = decode_search(&search_body(vec![result]), "https://x.test/jobs");

        assert_eq!(jobs[0].title, "N/A");
        assert_eq!(jobs[0].client.country, "N/A");
        assert_eq!(jobs[0].budget.amount, "$250");
    }

    #[test]
    fn zero_fixed_price_is_still_fixed() {
        let mut result = raw_result("~01", "Rust", "US");
        result["jobTile"]["job"]["fixedPriceAmount"] = json!({ "amount": "0.0", "isoCurrencyCode": "USD" });

        let jobs = decode_search(&search_body(vec![result]), "https://x.test/jobs");

        assert_eq!(jobs[0].budget, Budget { kind: "FIXED".into(), amount: "$0".into() });
    }

    #[test]
    fn hourly_tile_ignores_placeholder_fixed_amount() {
        let mut result = raw_result("~01", "Rust", "US");
        result["jobTile"]["job"]["jobType"] = json!("HOURLY");
        result["jobTile"]["job"]["fixedPriceAmount"] = json!({ "amount": "0.0" });
        result["jobTile"]["job"]["hourlyBudgetMin"] = json!("25");

        let jobs = decode_search(&search_body(vec![result]), "https://x.test/jobs");

        assert_eq!(jobs[0].budget.amount, "$25+/hr");
    }

    #[test]
    fn malformed_details_section_keeps_the_rest() {
        let job = decode_search(&search_body(vec![raw_result("~01", "Rust", "US")]), "https://x.test/jobs").remove(0);
        let body = json!({ "data": { "jobAuthDetails": {
            "opening": { "job": { "description": "Build it", "clientActivity": "hidden" } },
            "applicantsBidsStats": { "avgRateBid": 30, "minRateBid": { "amount": "10" } }
        }}});

        let details = decode_details(&body, job);

        assert_eq!(details.description, "Build it");
        assert_eq!(details.activity, Activity::default());
        assert_eq!(details.bid_stats, Some(BidStats { avg: 30.0, min: 10.0, max: 0.0 }));
    }

    #[test]
    fn results_without_cipher_text_are_skipped() {
        let body = search_body(vec![json!({ "title": "no tile" }), raw_result("~03", "ok", "US")]);
        let jobs = decode_search(&body, "https://x.test/jobs");
        assert_eq!(jobs.iter().map(|j| j.id.as_str()).collect::<Vec<_>>(), vec!["~03"]);
    }

    #[test]
    fn missing_results_array_is_empty() {
        assert!(decode_search(&json!({ "data": { "search": null } }), "https://x.test").is_empty());
    }

    #[test]
    fn details_merge_onto_summary() {
        let job = decode_search(&search_body(vec![raw_result("~01", "Rust", "US")]), "https://x.test/jobs").remove(0);
        let body = json!({ "data": { "jobAuthDetails": {
            "opening": { "job": { "description": "Build it", "clientActivity": {
                "lastBuyerActivity": "2024-05-02T00:00:00Z", "totalApplicants": 12, "totalInvitedToInterview": 3, "invitationsSent": 5
            }}},
            "buyer": { "info": { "stats": {
                "totalAssignments": 40, "totalJobsWithHires": 30, "activeAssignmentsCount": 2,
                "feedbackCount": 25, "score": 4.8, "totalCharges": { "amount": "9000.5" }
            }}},
            "applicantsBidsStats": { "avgRateBid": { "amount": 45 }, "minRateBid": { "amount": 20 }, "maxRateBid": { "amount": 80 } }
        }}});

        let details = decode_details(&body, job.clone());
        assert_eq!(details.job, job);
        assert_eq!(details.description, "Build it");
        assert_eq!(details.client_stats.jobs_posted, 40);
        assert_eq!(details.client_stats.total_hires, 30);
        assert_eq!(details.client_stats.total_spent, 9000.5);
        assert_eq!(details.activity.applicants, 12);
        assert_eq!(details.activity.invites_sent, 5);
        assert_eq!(details.bid_stats, Some(BidStats { avg: 45.0, min: 20.0, max: 80.0 }));
    }

    #[test]
    fn details_without_bid_average_have_no_bid_stats() {
        let job = decode_search(&search_body(vec![raw_result("~01", "Rust", "US")]), "https://x.test/jobs").remove(0);
        let details = decode_details(&json!({ "data": { "jobAuthDetails": { "applicantsBidsStats": { "minRateBid": { "amount": 1 } } } } }), job);
        assert_eq!(details.bid_stats, None);
        assert_eq!(details.description, "No description.");
        assert_eq!(details.client_stats, ClientStats::default());
        assert_eq!(details.activity.last_viewed, None);
    }

    #[test]
    fn blank_query_uses_default() {
        let server = MockServer::start();
        let storage = Storage::in_memory();
        let request = fetcher(&server, &storage).search_request("   ");
        assert_eq!(request.variables["req"]["userQuery"], "rust");
        assert_eq!(request.variables["req"]["paging"]["count"], 10);
        assert_eq!(request.variables["req"]["contractorTier"], json!(["IntermediateLevel", "ExpertLevel"]));
    }

    #[tokio::test]
    async fn search_goes_through_the_search_alias() {
        let server = MockServer::start_async().await;
        let storage = Storage::in_memory();
        storage.set_last_good_token(Some("oauth2v2_sticky")).await.unwrap();
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/graphql").query_param("alias", SEARCH_ALIAS).body_contains("elixir");
                then.status(200).json_body(search_body(vec![raw_result("~01", "Elixir dev", "US")]));
            })
            .await;

        let jobs = fetcher(&server, &storage).search("elixir").await.unwrap();

        mock.assert_hits_async(1).await;
        assert_eq!(jobs[0].title, "Elixir dev");
    }

    #[tokio::test]
    async fn details_for_unknown_job_makes_no_request() {
        let server = MockServer::start_async().await;
        let storage = Storage::in_memory();
        storage.set_last_good_token(Some("oauth2v2_sticky")).await.unwrap();
        let any = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!({ "data": {} }));
            })
            .await;

        let err = fetcher(&server, &storage).details("~missing").await.unwrap_err();

        assert!(matches!(err, Error::JobNotFound(id) if id == "~missing"));
        any.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn details_for_known_job_uses_details_alias() {
        let server = MockServer::start_async().await;
        let storage = Storage::in_memory();
        storage.set_last_good_token(Some("oauth2v2_sticky")).await.unwrap();
        let job = decode_search(&search_body(vec![raw_result("~01", "Rust", "US")]), "https://x.test/jobs").remove(0);
        storage.set_recent_jobs(&[job]).await.unwrap();
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/graphql").query_param("alias", DETAILS_ALIAS);
                then.status(200).json_body(json!({ "data": { "jobAuthDetails": { "opening": { "job": { "description": "Hi" } } } } }));
            })
            .await;

        let details = fetcher(&server, &storage).details("~01").await.unwrap();

        mock.assert_hits_async(1).await;
        assert_eq!(details.description, "Hi");
        assert_eq!(details.job.title, "Rust");
    }
}
