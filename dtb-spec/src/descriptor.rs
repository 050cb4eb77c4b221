// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Static tables of device tree blob sub-packages.

Every architecture family ships one `dtb-*` sub-package per SoC vendor or
board family. The tables below define those sub-packages in the order they
appear in the generated spec file.
*/

use {
    crate::error::{Result, SpecError},
    strum::EnumIter,
};

/// A CPU architecture family a DTB spec file is generated for.
#[derive(Clone, Copy, Debug, EnumIter, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ArchFamily {
    /// 32-bit ARMv6 (Raspberry Pi 1 and Zero).
    Armv6,
    /// 32-bit ARMv7.
    Armv7,
    /// 64-bit ARMv8 and later.
    Aarch64,
    /// 64-bit RISC-V.
    Riscv64,
}

impl std::str::FromStr for ArchFamily {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "armv6" => Ok(Self::Armv6),
            "armv7" => Ok(Self::Armv7),
            "aarch64" => Ok(Self::Aarch64),
            "riscv64" => Ok(Self::Riscv64),
            _ => Err(SpecError::UnknownArchitecture(s.to_string())),
        }
    }
}

impl std::fmt::Display for ArchFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.selector())
    }
}

impl ArchFamily {
    /// The token used to select this family on the command line.
    pub fn selector(&self) -> &'static str {
        match self {
            Self::Armv6 => "armv6",
            Self::Armv7 => "armv7",
            Self::Aarch64 => "aarch64",
            Self::Riscv64 => "riscv64",
        }
    }

    /// Name of the source package the generated spec file builds.
    ///
    /// This is also the file stem of the generated spec file.
    pub fn package_name(&self) -> &'static str {
        match self {
            Self::Armv6 => "dtb-armv6l",
            Self::Armv7 => "dtb-armv7l",
            Self::Aarch64 => "dtb-aarch64",
            Self::Riscv64 => "dtb-riscv64",
        }
    }

    /// Value of the RPM `ExclusiveArch` tag.
    pub fn exclusive_arch(&self) -> &'static str {
        match self {
            Self::Armv6 => "armv6l armv6hl",
            Self::Armv7 => "armv7l armv7hl",
            Self::Aarch64 => "aarch64",
            Self::Riscv64 => "riscv64",
        }
    }

    /// Kernel source architecture whose `boot/dts` directory holds our sources.
    pub fn dts_arch(&self) -> &'static str {
        match self {
            Self::Armv6 | Self::Armv7 => "arm",
            Self::Aarch64 => "arm64",
            Self::Riscv64 => "riscv",
        }
    }

    /// The sub-packages built for this family, in spec file order.
    pub fn descriptors(&self) -> &'static [PackageDescriptor] {
        match self {
            Self::Armv6 => ARMV6_PACKAGES,
            Self::Armv7 => ARMV7_PACKAGES,
            Self::Aarch64 => AARCH64_PACKAGES,
            Self::Riscv64 => RISCV64_PACKAGES,
        }
    }
}

/// Describes a single `dtb-*` sub-package.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PackageDescriptor {
    /// RPM name of the sub-package.
    pub name: &'static str,

    /// Whitespace delimited globs of `.dts` files, relative to the DTS directory.
    pub source_pattern: &'static str,

    /// Human readable description of the supported hardware.
    pub description: &'static str,
}

impl PackageDescriptor {
    pub const fn new(
        name: &'static str,
        source_pattern: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            source_pattern,
            description,
        }
    }

    /// Iterate over the individual globs in the source pattern.
    pub fn source_globs(&self) -> impl Iterator<Item = &'static str> {
        self.source_pattern.split_ascii_whitespace()
    }
}

const ARMV6_PACKAGES: &[PackageDescriptor] = &[PackageDescriptor::new(
    "dtb-bcm2835",
    "broadcom/bcm2835-*.dts",
    "BCM2835 based systems",
)];

const ARMV7_PACKAGES: &[PackageDescriptor] = &[
    PackageDescriptor::new("dtb-am335x", "ti/omap/am335x-*.dts", "AM335x based systems"),
    PackageDescriptor::new("dtb-am57xx", "ti/omap/am57xx-*.dts", "AM57xx based systems"),
    PackageDescriptor::new(
        "dtb-bcm2836",
        "broadcom/bcm2836-*.dts",
        "BCM2836 based systems",
    ),
    PackageDescriptor::new(
        "dtb-bcm2837",
        "broadcom/bcm2837-*.dts",
        "BCM2837 based systems",
    ),
    PackageDescriptor::new(
        "dtb-exynos4",
        "samsung/exynos4*.dts",
        "Samsung Exynos 4 based systems",
    ),
    PackageDescriptor::new(
        "dtb-exynos5",
        "samsung/exynos5*.dts",
        "Samsung Exynos 5 based systems",
    ),
    PackageDescriptor::new("dtb-imx6", "nxp/imx/imx6*.dts", "i.MX6 based systems"),
    PackageDescriptor::new("dtb-imx7", "nxp/imx/imx7*.dts", "i.MX7 based systems"),
    PackageDescriptor::new("dtb-omap4", "ti/omap/omap4*.dts", "OMAP4 based systems"),
    PackageDescriptor::new(
        "dtb-rk32xx",
        "rockchip/rk32*.dts",
        "Rockchip RK32xx based systems",
    ),
    PackageDescriptor::new(
        "dtb-socfpga",
        "intel/socfpga/socfpga_*.dts",
        "Intel SoCFPGA based systems",
    ),
    PackageDescriptor::new(
        "dtb-sun7i",
        "allwinner/sun7i-*.dts",
        "Allwinner A20 based systems",
    ),
    PackageDescriptor::new(
        "dtb-sun8i",
        "allwinner/sun8i-*.dts",
        "Allwinner H3 and A83T based systems",
    ),
    PackageDescriptor::new("dtb-tegra", "nvidia/tegra*.dts", "NVIDIA Tegra based systems"),
    PackageDescriptor::new(
        "dtb-vexpress",
        "arm/vexpress-*.dts",
        "ARM Versatile Express systems",
    ),
    PackageDescriptor::new("dtb-zynq", "xilinx/zynq-*.dts", "Xilinx Zynq based systems"),
];

const AARCH64_PACKAGES: &[PackageDescriptor] = &[
    PackageDescriptor::new(
        "dtb-allwinner",
        "allwinner/*.dts",
        "Allwinner based arm64 systems",
    ),
    PackageDescriptor::new("dtb-altera", "altera/*.dts", "Altera based arm64 systems"),
    PackageDescriptor::new("dtb-amazon", "amazon/*.dts", "Amazon based arm64 systems"),
    PackageDescriptor::new("dtb-amd", "amd/*.dts", "AMD based arm64 systems"),
    PackageDescriptor::new("dtb-amlogic", "amlogic/*.dts", "Amlogic based arm64 systems"),
    PackageDescriptor::new("dtb-apm", "apm/*.dts", "APM based arm64 systems"),
    PackageDescriptor::new("dtb-apple", "apple/*.dts", "Apple silicon based arm64 systems"),
    PackageDescriptor::new("dtb-arm", "arm/*.dts", "ARM Ltd. based arm64 systems"),
    PackageDescriptor::new(
        "dtb-broadcom",
        "broadcom/*.dts broadcom/northstar2/*.dts broadcom/stingray/*.dts",
        "Broadcom based arm64 systems",
    ),
    PackageDescriptor::new("dtb-cavium", "cavium/*.dts", "Cavium based arm64 systems"),
    PackageDescriptor::new("dtb-exynos", "exynos/*.dts", "Samsung Exynos based arm64 systems"),
    PackageDescriptor::new(
        "dtb-freescale",
        "freescale/*.dts",
        "Freescale based arm64 systems",
    ),
    PackageDescriptor::new(
        "dtb-hisilicon",
        "hisilicon/*.dts",
        "HiSilicon based arm64 systems",
    ),
    PackageDescriptor::new("dtb-lg", "lg/*.dts", "LG based arm64 systems"),
    PackageDescriptor::new("dtb-marvell", "marvell/*.dts", "Marvell based arm64 systems"),
    PackageDescriptor::new(
        "dtb-mediatek",
        "mediatek/*.dts",
        "MediaTek based arm64 systems",
    ),
    PackageDescriptor::new("dtb-nvidia", "nvidia/*.dts", "NVIDIA based arm64 systems"),
    PackageDescriptor::new("dtb-qcom", "qcom/*.dts", "Qualcomm based arm64 systems"),
    PackageDescriptor::new("dtb-renesas", "renesas/*.dts", "Renesas based arm64 systems"),
    PackageDescriptor::new(
        "dtb-rockchip",
        "rockchip/*.dts",
        "Rockchip based arm64 systems",
    ),
    PackageDescriptor::new(
        "dtb-socionext",
        "socionext/*.dts",
        "Socionext based arm64 systems",
    ),
    PackageDescriptor::new("dtb-sprd", "sprd/*.dts", "Spreadtrum based arm64 systems"),
    PackageDescriptor::new("dtb-xilinx", "xilinx/*.dts", "Xilinx based arm64 systems"),
];

const RISCV64_PACKAGES: &[PackageDescriptor] = &[
    PackageDescriptor::new(
        "dtb-allwinner",
        "allwinner/*.dts",
        "Allwinner based riscv64 systems",
    ),
    PackageDescriptor::new("dtb-canaan", "canaan/*.dts", "Canaan based riscv64 systems"),
    PackageDescriptor::new(
        "dtb-microchip",
        "microchip/*.dts",
        "Microchip based riscv64 systems",
    ),
    PackageDescriptor::new("dtb-renesas", "renesas/*.dts", "Renesas based riscv64 systems"),
    PackageDescriptor::new("dtb-sifive", "sifive/*.dts", "SiFive based riscv64 systems"),
    PackageDescriptor::new(
        "dtb-starfive",
        "starfive/*.dts",
        "StarFive based riscv64 systems",
    ),
    PackageDescriptor::new("dtb-thead", "thead/*.dts", "T-HEAD based riscv64 systems"),
];

/// Names that renamed sub-packages were once shipped under.
///
/// Each alias is emitted as an extra `Provides:` so upgrades from the old
/// name keep working.
pub fn legacy_provides(family: ArchFamily, package: &str) -> &'static [&'static str] {
    match (family, package) {
        (ArchFamily::Armv7, "dtb-imx6") => &["dtb-imx6q", "dtb-imx6sl"],
        (ArchFamily::Armv7, "dtb-sun7i") => &["dtb-allwinner-a20"],
        (ArchFamily::Aarch64, "dtb-allwinner") => &["dtb-sun50i"],
        (ArchFamily::Aarch64, "dtb-amd") => &["dtb-amd-seattle"],
        (ArchFamily::Aarch64, "dtb-exynos") => &["dtb-samsung"],
        (ArchFamily::Aarch64, "dtb-freescale") => &["dtb-nxp"],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use {super::*, std::collections::HashSet, strum::IntoEnumIterator};

    #[test]
    fn selector_round_trip() -> Result<()> {
        for family in ArchFamily::iter() {
            assert_eq!(family.selector().parse::<ArchFamily>()?, family);
            assert_eq!(family.to_string(), family.selector());
        }

        Ok(())
    }

    #[test]
    fn unknown_selector() {
        assert!(matches!(
            "x86_64".parse::<ArchFamily>(),
            Err(SpecError::UnknownArchitecture(s)) if s == "x86_64"
        ));
        assert!("armv7l".parse::<ArchFamily>().is_err());
    }

    #[test]
    fn tables_are_well_formed() {
        for family in ArchFamily::iter() {
            let descriptors = family.descriptors();
            assert!(!descriptors.is_empty(), "{} has descriptors", family);

            let mut seen = HashSet::new();
            for d in descriptors {
                assert!(d.name.starts_with("dtb-"), "{}", d.name);
                assert!(seen.insert(d.name), "{} duplicated in {}", d.name, family);
                assert!(d.source_globs().all(|glob| glob.ends_with(".dts")));
                assert!(!d.description.is_empty());
            }
        }
    }

    #[test]
    fn legacy_provides_lookup() {
        assert_eq!(
            legacy_provides(ArchFamily::Aarch64, "dtb-allwinner"),
            &["dtb-sun50i"]
        );
        // Keyed on the family as well as the name.
        assert!(legacy_provides(ArchFamily::Riscv64, "dtb-allwinner").is_empty());
        assert!(legacy_provides(ArchFamily::Aarch64, "dtb-foo").is_empty());
    }

    #[test]
    fn multiple_source_globs() {
        let broadcom = ArchFamily::Aarch64
            .descriptors()
            .iter()
            .find(|d| d.name == "dtb-broadcom")
            .unwrap();

        assert_eq!(broadcom.source_globs().count(), 3);
    }
}
