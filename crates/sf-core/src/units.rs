// sf-core/src/units.rs
//
// Reported quantities follow the wastewater convention: flow in m3/d and
// concentrations in mg/L. Internally the state vectors carry bare f64 in those
// units; conversion to SI happens only at the reporting boundary.

use uom::si::f64::{MassDensity as UomMassDensity, VolumeRate as UomVolumeRate};

pub type Concentration = UomMassDensity;
pub type VolumeRate = UomVolumeRate;

pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// 1 mg/L == 1 g/m3 == 1e-3 kg/m3.
pub const MG_PER_L_TO_KG_PER_M3: f64 = 1e-3;

#[inline]
pub fn m3_per_day(v: f64) -> VolumeRate {
    use uom::si::volume_rate::cubic_meter_per_second;
    VolumeRate::new::<cubic_meter_per_second>(v / SECONDS_PER_DAY)
}

#[inline]
pub fn mg_per_l(v: f64) -> Concentration {
    use uom::si::mass_density::kilogram_per_cubic_meter;
    Concentration::new::<kilogram_per_cubic_meter>(v * MG_PER_L_TO_KG_PER_M3)
}

/// Read back a volume rate in m3/d.
#[inline]
pub fn as_m3_per_day(q: VolumeRate) -> f64 {
    use uom::si::volume_rate::cubic_meter_per_second;
    q.get::<cubic_meter_per_second>() * SECONDS_PER_DAY
}

/// Read back a concentration in mg/L.
#[inline]
pub fn as_mg_per_l(c: Concentration) -> f64 {
    use uom::si::mass_density::kilogram_per_cubic_meter;
    c.get::<kilogram_per_cubic_meter>() / MG_PER_L_TO_KG_PER_M3
}
