//! Logical channel roles and their room positions.
//!
//! Positions live in a unit cube around the listener: `x` grows to the
//! right, `y` upwards and `z` towards the front.

use std::fmt::Display;

use crate::render::vector::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceChannel {
    FrontLeft,
    FrontCenter,
    FrontRight,
    ScreenLFE,
    SideLeft,
    SideRight,
    RearLeft,
    RearCenter,
    RearRight,
    FrontLeftCenter,
    FrontRightCenter,
    WideLeft,
    WideRight,
    TopFrontLeft,
    TopFrontCenter,
    TopFrontRight,
    TopSideLeft,
    TopSideRight,
    TopRearLeft,
    TopRearCenter,
    TopRearRight,
    GodsVoice,
    Unknown,
}

impl ReferenceChannel {
    #[rustfmt::skip]
    pub const fn position(self) -> Vec3 {
        use ReferenceChannel::*;

        match self {
            FrontLeft        => Vec3::new(-1.0, 0.0,  1.0),
            FrontCenter      => Vec3::new( 0.0, 0.0,  1.0),
            FrontRight       => Vec3::new( 1.0, 0.0,  1.0),
            ScreenLFE        => Vec3::new( 0.0, -1.0, 1.0),
            SideLeft         => Vec3::new(-1.0, 0.0,  0.0),
            SideRight        => Vec3::new( 1.0, 0.0,  0.0),
            RearLeft         => Vec3::new(-1.0, 0.0, -1.0),
            RearCenter       => Vec3::new( 0.0, 0.0, -1.0),
            RearRight        => Vec3::new( 1.0, 0.0, -1.0),
            FrontLeftCenter  => Vec3::new(-0.5, 0.0,  1.0),
            FrontRightCenter => Vec3::new( 0.5, 0.0,  1.0),
            WideLeft         => Vec3::new(-1.0, 0.0,  0.5),
            WideRight        => Vec3::new( 1.0, 0.0,  0.5),
            TopFrontLeft     => Vec3::new(-1.0, 1.0,  1.0),
            TopFrontCenter   => Vec3::new( 0.0, 1.0,  1.0),
            TopFrontRight    => Vec3::new( 1.0, 1.0,  1.0),
            TopSideLeft      => Vec3::new(-1.0, 1.0,  0.0),
            TopSideRight     => Vec3::new( 1.0, 1.0,  0.0),
            TopRearLeft      => Vec3::new(-1.0, 1.0, -1.0),
            TopRearCenter    => Vec3::new( 0.0, 1.0, -1.0),
            TopRearRight     => Vec3::new( 1.0, 1.0, -1.0),
            GodsVoice        => Vec3::new( 0.0, 1.0,  0.0),
            Unknown          => Vec3::new( 0.0, 0.0,  0.0),
        }
    }

    pub const fn is_lfe(self) -> bool {
        matches!(self, ReferenceChannel::ScreenLFE)
    }

    #[rustfmt::skip]
    pub const fn label(self) -> &'static str {
        use ReferenceChannel::*;

        match self {
            FrontLeft        => "L",
            FrontCenter      => "C",
            FrontRight       => "R",
            ScreenLFE        => "LFE",
            SideLeft         => "Ls",
            SideRight        => "Rs",
            RearLeft         => "Lrs",
            RearCenter       => "Cs",
            RearRight        => "Rrs",
            FrontLeftCenter  => "Lc",
            FrontRightCenter => "Rc",
            WideLeft         => "Lw",
            WideRight        => "Rw",
            TopFrontLeft     => "Ltf",
            TopFrontCenter   => "Ctf",
            TopFrontRight    => "Rtf",
            TopSideLeft      => "Lts",
            TopSideRight     => "Rts",
            TopRearLeft      => "Ltr",
            TopRearCenter    => "Ctr",
            TopRearRight     => "Rtr",
            GodsVoice        => "Ts",
            Unknown          => "?",
        }
    }
}

impl Display for ReferenceChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
