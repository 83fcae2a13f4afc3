//! Repair shop lookup against a static regional catalog.

use async_trait::async_trait;

use super::fintrack;
use crate::domain::output::{PriceRange, RepairAdvisorOutput, RepairShop};
use crate::domain::{AgentFailure, AgentOutput, Claim};
use crate::executor::{AgentContext, AgentHandler};

pub const MAX_RESULTS: usize = 3;

/// Ratings closer than this are treated as equal and ordered by distance.
const RATING_TIE: f64 = 0.2;

pub struct RepairAdvisorAgent;

#[async_trait]
impl AgentHandler for RepairAdvisorAgent {
    async fn handle(&self, ctx: AgentContext) -> Result<AgentOutput, AgentFailure> {
        Ok(AgentOutput::RepairAdvisor(find_shops(&ctx.claim)))
    }
}

#[allow(clippy::too_many_arguments)]
fn shop(
    id: &str,
    name: &str,
    specialty: &[&str],
    address: &str,
    phone: &str,
    rating: f64,
    reviews_count: u32,
    price_range: PriceRange,
    estimated_cost: u32,
    turnaround_days: u32,
    distance_miles: f64,
    certifications: &[&str],
) -> RepairShop {
    RepairShop {
        id: id.to_string(),
        name: name.to_string(),
        specialty: specialty.iter().map(|s| s.to_string()).collect(),
        address: address.to_string(),
        phone: phone.to_string(),
        rating,
        reviews_count,
        price_range,
        estimated_cost,
        turnaround_days,
        distance_miles,
        certifications: certifications.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn catalog() -> Vec<RepairShop> {
    vec![
        shop(
            "shop-1",
            "Joe's Auto Body & Repair",
            &["collision", "paint", "dent removal"],
            "123 Main St, Princeton, NJ 08540",
            "(609) 555-0100",
            4.8,
            342,
            PriceRange::Standard,
            1350,
            3,
            2.4,
            &["I-CAR Gold", "ASE Certified"],
        ),
        shop(
            "shop-2",
            "Princeton Collision Center",
            &["collision", "frame repair", "paint"],
            "456 Nassau St, Princeton, NJ 08542",
            "(609) 555-0200",
            4.9,
            578,
            PriceRange::Premium,
            1650,
            2,
            1.8,
            &["I-CAR Platinum", "ASE Certified", "Tesla Certified"],
        ),
        shop(
            "shop-3",
            "Route 1 Auto Works",
            &["collision", "mechanical", "paint"],
            "789 Route 1, Lawrence Township, NJ 08648",
            "(609) 555-0300",
            4.6,
            215,
            PriceRange::Budget,
            980,
            5,
            4.2,
            &["ASE Certified"],
        ),
        shop(
            "shop-4",
            "Elite European Auto Body",
            &["european cars", "paint", "luxury repairs"],
            "321 Alexander St, Princeton, NJ 08540",
            "(609) 555-0400",
            4.7,
            189,
            PriceRange::Premium,
            1850,
            4,
            2.1,
            &["I-CAR Platinum", "BMW Certified", "Mercedes Certified"],
        ),
        shop(
            "shop-5",
            "QuickFix Auto Body",
            &["quick repairs", "dent removal", "paint"],
            "567 College Rd, Princeton, NJ 08540",
            "(609) 555-0500",
            4.4,
            423,
            PriceRange::Budget,
            850,
            2,
            3.5,
            &["I-CAR Gold"],
        ),
    ]
}

/// Higher rating first; near-equal ratings fall back to the closer shop.
fn ranks_before(a: &RepairShop, b: &RepairShop) -> bool {
    if (a.rating - b.rating).abs() > RATING_TIE {
        a.rating > b.rating
    } else {
        a.distance_miles < b.distance_miles
    }
}

/// Stable insertion sort; the tie rule is not transitive, so a total-order
/// sort cannot be used.
fn rank(shops: &mut [RepairShop]) {
    for i in 1..shops.len() {
        let mut j = i;
        while j > 0 && ranks_before(&shops[j], &shops[j - 1]) {
            shops.swap(j, j - 1);
            j -= 1;
        }
    }
}

pub fn find_shops(claim: &Claim) -> RepairAdvisorOutput {
    let mut shops = catalog();
    if claim.incident_data.incident_type.is_collision() {
        shops.retain(|s| s.specialty.iter().any(|sp| sp == "collision"));
    }
    rank(&mut shops);

    let base = fintrack::estimate(claim).damage_total as f64;
    for s in &mut shops {
        s.estimated_cost = (base * s.price_range.cost_multiplier()).round() as u32;
    }

    let total_found = shops.len();
    let recommendation = shops
        .iter()
        .find(|s| s.price_range == PriceRange::Standard)
        .or_else(|| shops.first())
        .map(|top| {
            format!(
                "{}: best balance of quality ({}/5) and value. {}",
                top.name,
                top.rating,
                top.certifications.join(", ")
            )
        });
    shops.truncate(MAX_RESULTS);

    RepairAdvisorOutput {
        shops,
        total_found,
        search_location: claim.incident_data.location.clone(),
        recommendation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::claim::fixtures::sample_claim;
    use crate::domain::IncidentType;

    #[test]
    fn test_collision_filters_and_ranks() {
        let out = find_shops(&sample_claim());
        let ids: Vec<&str> = out.shops.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["shop-2", "shop-1", "shop-3"]);
        assert_eq!(out.total_found, 3);
        assert!(out
            .recommendation
            .as_deref()
            .unwrap()
            .starts_with("Joe's Auto Body & Repair"));
    }

    #[test]
    fn test_costs_scale_with_price_range() {
        // moderate claim estimates 2750
        let out = find_shops(&sample_claim());
        let cost = |id: &str| out.shops.iter().find(|s| s.id == id).unwrap().estimated_cost;
        assert_eq!(cost("shop-1"), 2750);
        assert_eq!(cost("shop-2"), 3438);
        assert_eq!(cost("shop-3"), 2338);
    }

    #[test]
    fn test_non_collision_searches_whole_catalog() {
        let mut claim = sample_claim();
        claim.incident_data.incident_type = IncidentType::ParkingLot;
        let out = find_shops(&claim);
        assert_eq!(out.total_found, 5);
        assert_eq!(out.shops.len(), MAX_RESULTS);
        assert_eq!(out.search_location, claim.incident_data.location);
    }
}
