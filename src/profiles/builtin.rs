// Shipped report templates
use super::DocumentProfile;

/// Registered profiles, in match order.
pub fn registered() -> Vec<DocumentProfile> {
    vec![rx_maugeri(), tsa_maugeri()]
}

/// Radiology reports, Lumezzane imaging service.
pub fn rx_maugeri() -> DocumentProfile {
    DocumentProfile::builder("rx_maugeri")
        .identify([
            "Istituto Scientifico di Lumezzane",
            "Servizio di Diagnostica per Immagini",
        ])
        .capture([r"Sig\./Sig\.ra:\s+([A-Za-z][A-Za-z\s]+?)(?:\s{2,}|ID\s+Paziente)"])
        .exclude([
            r"Istituto\s+Scientifico",
            r"Servizio\s+di\s+Diagnostica",
            r"Primario:",
            r"Tel\.",
            r"Fax\.",
            r"Email:",
            r"Sig\./Sig\.ra:",
            r"Data\s+di\s+Nascita:",
            r"\d{2}/\d{2}/\d{4}",
            r"Codice\s+Fiscale:",
            r"[A-Z]{6}\d{2}[A-Z]\d{2}[A-Z]\d{3}[A-Z]",
            r"ID\s+Paziente:",
            r"PK-\d+",
            r"N\.\s+di\s+accesso:",
            r"\d{10}",
            r"Provenienza:",
            r"ESTERNO",
            r"Prestazione\s+eseguita:",
            r"Schedulazione:",
            r"Esecuzione:",
            r"Classe\s+dose:",
            r"Data\s+validazione",
            r"Documento\s+informatico",
            r"stampa\s+costituisce",
            r"D\.Lgs",
            r"Pag\s+\d+\s+di\s+\d+",
            r"TSRM:",
        ])
        .retain([r"Medico\s+Radiologo:"])
        .build()
}

/// Supra-aortic trunk colour doppler reports.
pub fn tsa_maugeri() -> DocumentProfile {
    DocumentProfile::builder("tsa_maugeri")
        .identify(["ECOCOLORDOPPLER TRONCHI SOVRAORTICI"])
        .capture([r"Paziente:\s+([A-Z]+\s+[A-Z]+)\s+Anni:"])
        .exclude([
            // institution header
            r"Istituti\s+Clinici\s+Scientifici\s+Maugeri",
            r"Via\s+Salvatore\s+Maugeri",
            r"C\.F\.\s+e\s+P\.IVA",
            r"Iscrizione\s+Rea:",
            r"Istituto\s+Scientifico\s+di\s+Lumezzane",
            r"UO\s+RIABILITAZIONE",
            r"Dirigente\s+Responsabile:",
            r"Via\s+Mazzini",
            r"25065\s+Lumezzane",
            r"Tel\s+030",
            r"URP\s+030",
            r"E-mail:",
            r"lumezzane@icsmaugeri",
            r"Ambulatorio,\s+LU",
            r"Lumezzane,\s+\d{2}/\d{2}/\d{4}",
            // patient block
            r"Paziente:",
            r"Data\s+di\s+Nascita:",
            r"Anni:\s+\d+",
            r"Sesso:\s+Maschio",
            r"Sesso:\s+Femmina",
            r"Codice\s+Paz\.\s+ID:",
            r"PK-\d+",
            r"Indirizzo:",
            r"Citt[aà]:",
            r"Telefono:",
            r"\d{10}",
            r"C\.F\.:",
            r"[A-Z]{6}\d{2}[A-Z]\d{2}[A-Z]\d{3}[A-Z]",
            r"Provenienza:",
            r"Esterno",
            r"Descrizione\s+Esame:",
            r"Quesito\s+Diagnostico:",
            // footer and legal notes
            r"il:\s+\d{2}/\d{2}/\d{4}",
            r"Ora:\s+\d{2}:\d{2}",
            r"Note\s+di\s+reperibilit",
            r"Le\s+informazioni\s+sanitarie",
            r"medico\s+curante",
            r"Documento\s+elettronico\s+firmato",
            r"DPR\s+445/2000",
            r"D\.Lgs\.\s+82/2005",
            r"Tutti\s+gli\s+esami\s+sono\s+archiviati",
            r"mancata\s+consegna\s+del\s+supporto",
            r"richiederne\s+copia",
            r"Istituti\s+Clinici\s+Scientifici\s+Spa",
            r"Pagina\s+\d+\s+di\s+\d+",
            r"Sistema\s+Sanitario",
            r"Regione\s+Lombardia",
            // boilerplate printed after the signature
            r"che,\s+nel\s+caso\s+di\s+dubbi",
            r"necessit.\s+di\s+approfondimenti",
            r"pu.\s+rivolgersi\s+allo\s+specialista",
            r"che\s+ha\s+redatto\s+il\s+referto",
            r"il\s+\d{2}/\d{2}/\d{2}\s+alle\s+\d{2}:\d{2}",
        ])
        .retain([
            r"Referto\s+firmato\s+digitalmente\s+da:",
            r"CONCLUSIONI",
            r"FOLLOW\s+UP",
        ])
        .section_break([
            "DISTRETTO CAROTIDEO SIN",
            "ARTERIE VERTEBRALI",
            "ARTERIE SUCCLAVIE",
            "CONCLUSIONI",
            "FOLLOW UP",
            "Referto firmato",
        ])
        .build()
}

/// Used when no registered profile identifies the document.
pub fn default_profile() -> DocumentProfile {
    DocumentProfile::builder("default")
        .capture([
            r"Sig\./Sig\.ra:\s+([A-Za-z][A-Za-z\s]+?)(?:\s{2,}|ID)",
            r"Sig\.\s+([A-Za-z][A-Za-z\s]+?)(?:\s{2,}|ID)",
            r"Paziente:\s+([A-Za-z][A-Za-z\s]+?)(?:\s{2,}|Data)",
        ])
        .exclude([
            r"Istituto",
            r"IRCCS",
            r"ASST",
            r"Ospedale",
            r"Servizio\s+di",
            r"Primario:",
            r"Direttore:",
            r"Tel\.",
            r"Fax\.",
            r"Email:",
            r"Sig\./Sig\.ra:",
            r"Sig\.\s+[A-Z]",
            r"Data\s+di\s+Nascita:",
            r"Data\s+nascita:",
            r"\d{2}/\d{2}/\d{4}",
            r"Codice\s+Fiscale:",
            r"[A-Z]{6}\d{2}[A-Z]\d{2}[A-Z]\d{3}[A-Z]",
            r"ID\s+Paziente:",
            r"N\.\s+di\s+accesso:",
            r"\d{10}",
            r"Provenienza:",
            r"Prestazione:",
            r"Schedulazione:",
            r"Esecuzione:",
            r"Data\s+validazione",
            r"Documento\s+informatico",
            r"stampa\s+costituisce",
            r"D\.Lgs",
            r"Pag\s+\d+\s+di\s+\d+",
            r"TSRM:",
            r"Tecnico:",
        ])
        .retain([r"Medico\s+Radiologo:", r"Medico\s+refertante:"])
        .build()
}
