//! PostGIS expression tree.
//!
//! Filters are built as typed values first and rendered into a
//! [`sqlx::QueryBuilder`] afterwards. Identifiers come from the validated
//! collection registry and SRIDs from the CRS registry, so both are written
//! inline; everything derived from the request (WKT, GeoJSON, distances,
//! timestamps, levels) goes through `push_bind`.

use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use edr_protocol::CrsConfig;

/// Day bucket format shared by instance ids and instance grouping.
pub const DAY_BUCKET_FORMAT: &str = "YYYY-MM-DD";

/// A geometry valued expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Geom {
    Column(String),
    FromText { wkt: String, srid: i32 },
    FromGeoJson(String),
    SetSrid(Box<Geom>, i32),
    Transform(Box<Geom>, i32),
    Force2d(Box<Geom>),
    Force3d(Box<Geom>),
    FlipCoordinates(Box<Geom>),
}

impl Geom {
    pub fn column(name: &str) -> Self {
        Geom::Column(name.to_string())
    }

    pub fn from_text(wkt: &str, srid: i32) -> Self {
        Geom::FromText {
            wkt: wkt.to_string(),
            srid,
        }
    }

    pub fn set_srid(self, srid: i32) -> Self {
        Geom::SetSrid(Box::new(self), srid)
    }

    pub fn transform(self, srid: i32) -> Self {
        Geom::Transform(Box::new(self), srid)
    }

    pub fn force_2d(self) -> Self {
        Geom::Force2d(Box::new(self))
    }

    pub fn force_3d(self) -> Self {
        Geom::Force3d(Box::new(self))
    }

    pub fn flip_coordinates(self) -> Self {
        Geom::FlipCoordinates(Box::new(self))
    }

    /// Flip only when the CRS declares latitude/northing first.
    pub fn flip_if(self, crs: &CrsConfig) -> Self {
        if crs.flips_axes() {
            self.flip_coordinates()
        } else {
            self
        }
    }

    pub fn push_to(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Geom::Column(name) => {
                qb.push(name);
            }
            Geom::FromText { wkt, srid } => {
                qb.push("ST_GeomFromText(");
                qb.push_bind(wkt.clone());
                qb.push(format!(", {})", srid));
            }
            Geom::FromGeoJson(json) => {
                qb.push("ST_GeomFromGeoJSON(");
                qb.push_bind(json.clone());
                qb.push(")");
            }
            Geom::SetSrid(inner, srid) => {
                qb.push("ST_SetSRID(");
                inner.push_to(qb);
                qb.push(format!(", {})", srid));
            }
            Geom::Transform(inner, srid) => {
                qb.push("ST_Transform(");
                inner.push_to(qb);
                qb.push(format!(", {})", srid));
            }
            Geom::Force2d(inner) => wrap(qb, "ST_Force2D", inner),
            Geom::Force3d(inner) => wrap(qb, "ST_Force3D", inner),
            Geom::FlipCoordinates(inner) => wrap(qb, "ST_FlipCoordinates", inner),
        }
    }
}

fn wrap(qb: &mut QueryBuilder<'_, Postgres>, function: &str, inner: &Geom) {
    qb.push(function);
    qb.push("(");
    inner.push_to(qb);
    qb.push(")");
}

/// The stored geometry as it must appear in a response.
///
/// The order is fixed: the SRID is stamped before reprojecting,
/// dimensionality is coerced in the target CRS and the axis flip comes last.
pub fn output_geometry(column: &str, storage_srid: i32, crs: &CrsConfig) -> Geom {
    let geom = Geom::column(column)
        .set_srid(storage_srid)
        .transform(crs.srid);
    let geom = if crs.has_vertical {
        geom.force_3d()
    } else {
        geom.force_2d()
    };
    geom.flip_if(crs)
}

/// A scalar expression over the source table.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Column(String),
    /// `ST_Z` of a geometry.
    Z(Geom),
    /// `TO_CHAR(column, 'YYYY-MM-DD')`.
    DayBucket(String),
}

impl Scalar {
    pub fn column(name: &str) -> Self {
        Scalar::Column(name.to_string())
    }

    /// Height of a geometry column, 0 for 2D rows.
    pub fn z_of(column: &str) -> Self {
        Scalar::Z(Geom::column(column).force_3d())
    }

    pub fn day_bucket(column: &str) -> Self {
        Scalar::DayBucket(column.to_string())
    }

    pub fn push_to(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Scalar::Column(name) => {
                qb.push(name);
            }
            Scalar::Z(geom) => wrap(qb, "ST_Z", geom),
            Scalar::DayBucket(column) => {
                qb.push(format!("TO_CHAR({}, '{}')", column, DAY_BUCKET_FORMAT));
            }
        }
    }
}

/// A bound value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Timestamp(DateTime<Utc>),
    Timestamps(Vec<DateTime<Utc>>),
    Float(f64),
    Floats(Vec<f64>),
    Text(String),
}

impl Literal {
    fn push_to(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Literal::Timestamp(v) => qb.push_bind(*v),
            Literal::Timestamps(v) => qb.push_bind(v.clone()),
            Literal::Float(v) => qb.push_bind(*v),
            Literal::Floats(v) => qb.push_bind(v.clone()),
            Literal::Text(v) => qb.push_bind(v.clone()),
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Le,
    Ge,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Le => "<=",
            CompareOp::Ge => ">=",
        }
    }
}

/// A boolean filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Intersects(Geom, Geom),
    Intersects3d(Geom, Geom),
    /// Distance within, in the units of the operands' SRID.
    DWithin(Geom, Geom, f64),
    Compare {
        expr: Scalar,
        op: CompareOp,
        value: Literal,
    },
    /// `expr = ANY(array)`.
    AnyOf { expr: Scalar, values: Literal },
    IsNotNull(Scalar),
}

impl Predicate {
    pub fn compare(expr: Scalar, op: CompareOp, value: Literal) -> Self {
        Predicate::Compare { expr, op, value }
    }

    pub fn push_to(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Predicate::Intersects(a, b) => binary(qb, "ST_Intersects", a, b),
            Predicate::Intersects3d(a, b) => binary(qb, "ST_3DIntersects", a, b),
            Predicate::DWithin(a, b, distance) => {
                qb.push("ST_DWithin(");
                a.push_to(qb);
                qb.push(", ");
                b.push_to(qb);
                qb.push(", ");
                qb.push_bind(*distance);
                qb.push(")");
            }
            Predicate::Compare { expr, op, value } => {
                expr.push_to(qb);
                qb.push(format!(" {} ", op.as_str()));
                value.push_to(qb);
            }
            Predicate::AnyOf { expr, values } => {
                expr.push_to(qb);
                qb.push(" = ANY(");
                values.push_to(qb);
                qb.push(")");
            }
            Predicate::IsNotNull(expr) => {
                expr.push_to(qb);
                qb.push(" IS NOT NULL");
            }
        }
    }
}

fn binary(qb: &mut QueryBuilder<'_, Postgres>, function: &str, a: &Geom, b: &Geom) {
    qb.push(function);
    qb.push("(");
    a.push_to(qb);
    qb.push(", ");
    b.push_to(qb);
    qb.push(")");
}

/// Append ` WHERE p1 AND p2 ...`; nothing for an empty list.
pub fn push_where(qb: &mut QueryBuilder<'_, Postgres>, predicates: &[Predicate]) {
    for (i, predicate) in predicates.iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        predicate.push_to(qb);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edr_protocol::crs::{CrsRegistry, CRS84, CRS84H, EPSG_4326};

    fn render_geom(geom: &Geom) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("");
        geom.push_to(&mut qb);
        qb.sql().to_string()
    }

    fn render(predicates: &[Predicate]) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM isd");
        push_where(&mut qb, predicates);
        qb.sql().to_string()
    }

    #[test]
    fn test_output_geometry_order() {
        let registry = CrsRegistry::builtin();
        let crs84 = registry.resolve(CRS84).unwrap();
        assert_eq!(
            render_geom(&output_geometry("isd.geom", 4327, crs84)),
            "ST_Force2D(ST_Transform(ST_SetSRID(isd.geom, 4327), 4326))"
        );

        let epsg4326 = registry.resolve(EPSG_4326).unwrap();
        assert_eq!(
            render_geom(&output_geometry("isd.geom", 4327, epsg4326)),
            "ST_FlipCoordinates(ST_Force2D(ST_Transform(ST_SetSRID(isd.geom, 4327), 4326)))"
        );

        let crs84h = registry.resolve(CRS84H).unwrap();
        assert_eq!(
            render_geom(&output_geometry("geom", 4327, crs84h)),
            "ST_Force3D(ST_Transform(ST_SetSRID(geom, 4327), 4327))"
        );
    }

    #[test]
    fn test_wkt_is_bound() {
        let geom = Geom::from_text("POINT(36.8 -1.3)", 4326).transform(4327);
        assert_eq!(render_geom(&geom), "ST_Transform(ST_GeomFromText($1, 4326), 4327)");
    }

    #[test]
    fn test_where_clause() {
        assert_eq!(render(&[]), "SELECT 1 FROM isd");
        let sql = render(&[
            Predicate::compare(Scalar::z_of("geom"), CompareOp::Le, Literal::Float(100.0)),
            Predicate::AnyOf {
                expr: Scalar::column("datetime"),
                values: Literal::Timestamps(vec![Utc::now()]),
            },
            Predicate::IsNotNull(Scalar::column("geom")),
        ]);
        assert_eq!(
            sql,
            "SELECT 1 FROM isd WHERE ST_Z(ST_Force3D(geom)) <= $1 \
             AND datetime = ANY($2) AND geom IS NOT NULL"
        );
    }

    #[test]
    fn test_dwithin_binds_distance() {
        let sql = render(&[Predicate::DWithin(
            Geom::column("a").transform(3857),
            Geom::column("b").transform(3857),
            1000.0,
        )]);
        assert!(sql.ends_with("ST_DWithin(ST_Transform(a, 3857), ST_Transform(b, 3857), $1)"));
    }

    #[test]
    fn test_day_bucket() {
        let sql = render(&[Predicate::compare(
            Scalar::day_bucket("datetime"),
            CompareOp::Eq,
            Literal::Text("2025-01-01".to_string()),
        )]);
        assert!(sql.ends_with("TO_CHAR(datetime, 'YYYY-MM-DD') = $1"));
    }
}
