//! Static descriptors of every node kind and its parameters.
//!
//! Hosts build editors and serializers from this data instead of binding to
//! the concrete types.

use serde::Serialize;

/// Value type of a parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// Floating-point scalar.
    Float,
    /// Integer.
    Int,
    /// Flag.
    Bool,
    /// Child node reference.
    Noise,
    /// Response curve reference.
    Curve,
    /// 2D affine transform.
    #[serde(rename = "transform_2d")]
    Transform2D,
    /// 3D affine transform.
    #[serde(rename = "transform_3d")]
    Transform3D,
}

/// One named parameter of a node kind.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ParamDescriptor {
    /// Parameter name.
    pub name: &'static str,
    /// Value type.
    pub kind: ParamKind,
    /// Editor range hint as `"min,max,step"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
}

/// One node kind.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct NodeDescriptor {
    /// Kind name.
    pub name: &'static str,
    /// Number of child slots.
    pub arity: usize,
    /// False for the seeder, which drives a graph but is not part of it.
    pub evaluable: bool,
    /// Parameters in declaration order.
    pub params: &'static [ParamDescriptor],
}

const UNIT_RANGE: Option<&str> = Some("-1,1,0.001");

const fn param(name: &'static str, kind: ParamKind) -> ParamDescriptor {
    ParamDescriptor { name, kind, hint: None }
}

const fn ranged(name: &'static str) -> ParamDescriptor {
    ParamDescriptor { name, kind: ParamKind::Float, hint: UNIT_RANGE }
}

const fn node(
    name: &'static str,
    arity: usize,
    params: &'static [ParamDescriptor],
) -> NodeDescriptor {
    NodeDescriptor { name, arity, evaluable: true, params }
}

const CONSTANT: &[ParamDescriptor] = &[ranged("value")];

const PAIR: &[ParamDescriptor] = &[
    param("first", ParamKind::Noise),
    param("second", ParamKind::Noise),
];

const SOURCE: &[ParamDescriptor] = &[param("source", ParamKind::Noise)];

const CLAMP: &[ParamDescriptor] = &[
    param("source", ParamKind::Noise),
    ranged("lower_bound"),
    ranged("upper_bound"),
    param("normalized", ParamKind::Bool),
];

const CURVE: &[ParamDescriptor] = &[
    param("source", ParamKind::Noise),
    param("curve", ParamKind::Curve),
];

const AFFINE: &[ParamDescriptor] = &[
    param("source", ParamKind::Noise),
    param("scale", ParamKind::Float),
    param("bias", ParamKind::Float),
];

const MIX: &[ParamDescriptor] = &[
    param("first", ParamKind::Noise),
    param("second", ParamKind::Noise),
    param("selector", ParamKind::Noise),
];

const SELECT: &[ParamDescriptor] = &[
    param("first", ParamKind::Noise),
    param("second", ParamKind::Noise),
    param("selector", ParamKind::Noise),
    param("threshold", ParamKind::Float),
];

const LINEAR: &[ParamDescriptor] = &[
    param("inner_noise", ParamKind::Noise),
    param("scale", ParamKind::Float),
    param("bias", ParamKind::Float),
    param("transform_2d", ParamKind::Transform2D),
    param("transform_3d", ParamKind::Transform3D),
];

const RESCALER: &[ParamDescriptor] = &[
    param("noise", ParamKind::Noise),
    param("range", ParamKind::Float),
    param("step", ParamKind::Float),
];

const SEEDER: &[ParamDescriptor] = &[
    param("noise", ParamKind::Noise),
    param("seed", ParamKind::Int),
];

static CATALOG: [NodeDescriptor; 17] = [
    node("ConstantNoise", 0, CONSTANT),
    node("AddNoise", 2, PAIR),
    node("MultiplyNoise", 2, PAIR),
    node("MaxNoise", 2, PAIR),
    node("MinNoise", 2, PAIR),
    node("PowerNoise", 2, PAIR),
    node("AbsoluteNoise", 1, SOURCE),
    node("InvertNoise", 1, SOURCE),
    node("ClampNoise", 1, CLAMP),
    node("CurveNoise", 1, CURVE),
    node("AffineNoise", 1, AFFINE),
    node("MixNoise", 3, MIX),
    node("SelectNoise", 3, SELECT),
    node("NoiseProxy", 1, SOURCE),
    node("LinearTransformNoise", 1, LINEAR),
    node("RescalerNoise", 1, RESCALER),
    NodeDescriptor {
        name: "NoiseSeeder",
        arity: 0,
        evaluable: false,
        params: SEEDER,
    },
];

/// Every node kind, followed by the seeder.
#[must_use]
pub fn catalog() -> &'static [NodeDescriptor] {
    &CATALOG
}

/// Looks up a kind by name.
#[must_use]
pub fn describe(name: &str) -> Option<&'static NodeDescriptor> {
    CATALOG.iter().find(|descriptor| descriptor.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::{AddNoise, ClampNoise, ConstantNoise, SelectNoise};
    use std::collections::HashSet;

    #[test]
    fn test_catalog_is_complete_and_unique() {
        let names: HashSet<_> = catalog().iter().map(|d| d.name).collect();
        assert_eq!(names.len(), 17);
        assert_eq!(catalog().iter().filter(|d| d.evaluable).count(), 16);
    }

    #[test]
    fn test_arity_matches_operators() {
        let arity = |name| describe(name).map(|d| d.arity);
        assert_eq!(arity("ConstantNoise"), Some(ConstantNoise::default().operand_count()));
        assert_eq!(arity("AddNoise"), Some(AddNoise::default().operand_count()));
        assert_eq!(arity("ClampNoise"), Some(ClampNoise::default().operand_count()));
        assert_eq!(arity("SelectNoise"), Some(SelectNoise::default().operand_count()));
        assert!(describe("PerlinNoise").is_none());
    }

    #[test]
    fn test_serializes_to_toml() {
        #[derive(Serialize)]
        struct Doc {
            nodes: &'static [NodeDescriptor],
        }

        let text = toml::to_string(&Doc { nodes: catalog() }).unwrap();
        assert!(text.contains("name = \"ClampNoise\""));
        assert!(text.contains("kind = \"transform_2d\""));
        assert!(text.contains("hint = \"-1,1,0.001\""));
    }
}
