use crate::requests::validation::Rule;
use crate::types::AttachmentCategory;

/// Form field naming the institution a request is filed for
pub const INSTITUTION_FIELD: &str = "instansi_id";

/// Rules applied to `instansi_id` for every kind
pub const INSTITUTION_RULES: &[Rule] = &[Rule::Required, Rule::Uuid];

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub rules: &'static [Rule],
    /// Included in list responses; detail-only fields are omitted there
    pub in_summary: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct AttachmentSpec {
    pub name: &'static str,
    pub category: AttachmentCategory,
    pub required_on_create: bool,
    pub in_summary: bool,
}

/// Everything that differs between the six request kinds.
///
/// The lifecycle, repositories and handlers are written once against this
/// descriptor; `slug` is the URL segment and `table` the backing table.
#[derive(Debug)]
pub struct RequestKind {
    pub slug: &'static str,
    pub table: &'static str,
    /// Push notification title
    pub title: &'static str,
    /// Field holding the applicant's name in notification copy
    pub applicant_field: &'static str,
    pub fields: &'static [FieldSpec],
    pub attachments: &'static [AttachmentSpec],
}

impl RequestKind {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn attachment(&self, name: &str) -> Option<&AttachmentSpec> {
        self.attachments.iter().find(|a| a.name == name)
    }

    /// Field names followed by attachment slot names, in declaration order.
    /// This is the column order used by the SQL layer.
    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields
            .iter()
            .map(|f| f.name)
            .chain(self.attachments.iter().map(|a| a.name))
    }

    /// `(name, rules)` pairs validated on create and update
    pub fn validation_rules(&self) -> impl Iterator<Item = (&'static str, &'static [Rule])> + '_ {
        self.fields
            .iter()
            .map(|f| (f.name, f.rules))
            .chain(std::iter::once((INSTITUTION_FIELD, INSTITUTION_RULES)))
    }
}

const NAME: &[Rule] = &[Rule::Required, Rule::Ascii, Rule::MinLen(3), Rule::MaxLen(255)];
const TEXT: &[Rule] = &[Rule::Required, Rule::Ascii];
const PHONE: &[Rule] = &[Rule::Required, Rule::Numeric, Rule::MinLen(3), Rule::MaxLen(15)];
const IP: &[Rule] = &[Rule::Required, Rule::Ip];

const fn field(name: &'static str, rules: &'static [Rule]) -> FieldSpec {
    FieldSpec {
        name,
        rules,
        in_summary: true,
    }
}

const fn detail_field(name: &'static str, rules: &'static [Rule]) -> FieldSpec {
    FieldSpec {
        name,
        rules,
        in_summary: false,
    }
}

const fn document(name: &'static str) -> AttachmentSpec {
    AttachmentSpec {
        name,
        category: AttachmentCategory::Document,
        required_on_create: false,
        in_summary: true,
    }
}

const SURAT_PERMOHONAN: AttachmentSpec = document("surat_permohonan");

pub static GANGGUAN_JIP: RequestKind = RequestKind {
    slug: "gangguan-jip",
    table: "pengaduan_gangguan_jip",
    title: "Layanan Pengaduan Gangguan JIP",
    applicant_field: "nama_lengkap",
    fields: &[
        field("nama_lengkap", NAME),
        field("jabatan", NAME),
        field(
            "nomor_hp",
            &[Rule::Required, Rule::Numeric, Rule::MinLen(3), Rule::MaxLen(255)],
        ),
        field("lokasi_gangguan", TEXT),
        detail_field("deskripsi_gangguan", TEXT),
    ],
    attachments: &[
        SURAT_PERMOHONAN,
        AttachmentSpec {
            name: "foto",
            category: AttachmentCategory::Image,
            required_on_create: false,
            in_summary: false,
        },
    ],
};

pub static PEMBUATAN_EMAIL: RequestKind = RequestKind {
    slug: "pembuatan-email",
    table: "pembuatan_email",
    title: "Layanan Pembuatan Email",
    applicant_field: "nama_lengkap",
    fields: &[
        field("nama_lengkap", NAME),
        field(
            "nip",
            &[Rule::Required, Rule::Numeric, Rule::MinLen(18), Rule::MaxLen(18)],
        ),
        field("jabatan", NAME),
        field("nomor_hp", PHONE),
    ],
    attachments: &[document("berkas_sk"), SURAT_PERMOHONAN],
};

pub static PEMBUATAN_SUBDOMAIN: RequestKind = RequestKind {
    slug: "pembuatan-subdomain",
    table: "pembuatan_subdomain",
    title: "Layanan Pembuatan Subdomain",
    applicant_field: "nama_lengkap",
    fields: &[
        field("nama_lengkap", NAME),
        field("jabatan", NAME),
        field("nomor_hp", PHONE),
        field("nama_subdomain", TEXT),
        field("ip_publik", IP),
        detail_field("deskripsi", TEXT),
    ],
    attachments: &[SURAT_PERMOHONAN],
};

pub static PEMBANGUNAN_APLIKASI: RequestKind = RequestKind {
    slug: "pembangunan-aplikasi",
    table: "pembangunan_aplikasi",
    title: "Layanan Permohonan Pembangunan Aplikasi",
    applicant_field: "nama_pimpinan",
    fields: &[
        field("nama_pimpinan", NAME),
        field("nomor_hp", PHONE),
        field(
            "email_dinas",
            &[Rule::Required, Rule::Email, Rule::MinLen(3), Rule::MaxLen(255)],
        ),
        detail_field("riwayat_pimpinan", TEXT),
        field("jenis_aplikasi", TEXT),
        detail_field("tujuan_aplikasi", TEXT),
    ],
    attachments: &[SURAT_PERMOHONAN],
};

pub static PERUBAHAN_IP_SERVER: RequestKind = RequestKind {
    slug: "perubahan-ip-server",
    table: "perubahan_ip_server",
    title: "Layanan Perubahan IP Server",
    applicant_field: "nama_lengkap",
    fields: &[
        field("nama_lengkap", NAME),
        field("jabatan", NAME),
        field("nomor_hp", PHONE),
        field("nama_subdomain", NAME),
        field("ip_lama", IP),
        field("ip_baru", IP),
    ],
    attachments: &[AttachmentSpec {
        required_on_create: true,
        ..SURAT_PERMOHONAN
    }],
};

pub static PUSAT_DATA_DAERAH: RequestKind = RequestKind {
    slug: "pusat-data-daerah",
    table: "pusat_data_daerah",
    title: "Layanan Pusat Data Daerah",
    applicant_field: "nama_lengkap",
    fields: &[
        field("nama_lengkap", NAME),
        field("jabatan", NAME),
        field("nomor_hp", PHONE),
        field("jenis_layanan", TEXT),
    ],
    attachments: &[SURAT_PERMOHONAN],
};

pub static KINDS: [&RequestKind; 6] = [
    &GANGGUAN_JIP,
    &PEMBUATAN_EMAIL,
    &PEMBUATAN_SUBDOMAIN,
    &PEMBANGUNAN_APLIKASI,
    &PERUBAHAN_IP_SERVER,
    &PUSAT_DATA_DAERAH,
];

pub fn find_by_slug(slug: &str) -> Option<&'static RequestKind> {
    KINDS.iter().copied().find(|kind| kind.slug == slug)
}
